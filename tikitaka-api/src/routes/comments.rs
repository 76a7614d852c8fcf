/// Comment and vote endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/comments/text` - Add a text comment
/// - `POST /api/v1/comments/voice` - Upload a voice comment (processed in the background)
/// - `GET /api/v1/comments/:id` - Get a comment
/// - `GET /api/v1/comments/questions/:question_id` - Comments of a question
/// - `PUT /api/v1/comments/vote/:option_id` - Cast a vote
/// - `GET /api/v1/comments/vote/:question_id` - Vote result
/// - `DELETE /api/v1/comments/:id` - Delete a comment
/// - `GET /api/v1/comments/users/:user_id/{text,audio,vote}` - A user's inbox

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tikitaka_shared::{
    lifecycle::VoteResult,
    media::VoiceUpload,
    models::{
        comment::{Comment, CommentKind},
        vote_option::VoteOption,
    },
};
use tracing::info;
use uuid::Uuid;

/// Text comment request
#[derive(Debug, Deserialize)]
pub struct CreateTextCommentRequest {
    pub question_id: Uuid,
    pub content: String,
}

/// Add a text comment to a live question
///
/// # Errors
///
/// - `404 Not Found` / `410 Gone`: The question is missing or deleted
/// - `403 Forbidden`: The question has expired
/// - `415 Unsupported Media Type`: The question does not take text comments
/// - `422 Unprocessable Entity`: Content too long
pub async fn create_text_comment(
    State(state): State<AppState>,
    Json(req): Json<CreateTextCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .stores
        .comments
        .create_text(req.question_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Upload a voice comment
///
/// Takes a multipart form with a `question_id` field and a `file` field.
/// An empty audio placeholder is created and returned with
/// `202 Accepted`; the recording is pitch-shifted and stored in the
/// background, after which the placeholder carries the recording's URL.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed fields
/// - `404 Not Found`: No such question
/// - `415 Unsupported Media Type`: The question does not take audio comments
pub async fn create_voice_comment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let mut question_id = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("question_id") => {
                let raw = field.text().await?;
                let id = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| ApiError::BadRequest(format!("invalid question_id: {}", raw)))?;
                question_id = Some(id);
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_owned);
                let data: Bytes = field.bytes().await?;
                upload = Some(VoiceUpload { data, file_name });
            }
            _ => {}
        }
    }

    let question_id =
        question_id.ok_or_else(|| ApiError::BadRequest("question_id field is required".to_string()))?;
    let upload = upload
        .filter(|upload| !upload.data.is_empty())
        .ok_or_else(|| ApiError::BadRequest("file field is required".to_string()))?;

    let placeholder = state
        .stores
        .comments
        .create_audio_placeholder(question_id)
        .await?;

    info!(
        comment_id = %placeholder.id,
        question_id = %question_id,
        size = upload.data.len(),
        "Voice comment accepted"
    );
    state.voice.spawn(placeholder.id, upload);

    Ok((StatusCode::ACCEPTED, Json(placeholder)))
}

/// Get a comment
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Comment>> {
    state
        .stores
        .comments
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))
}

/// Comments of a question in insertion order
pub async fn question_comments(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.stores.comments.list_by_question(question_id).await?))
}

/// Cast one vote for an option
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(option_id): Path<Uuid>,
) -> ApiResult<Json<VoteOption>> {
    Ok(Json(state.stores.votes.increment(option_id).await?))
}

/// Aggregated result of a vote question
pub async fn vote_result(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> ApiResult<Json<VoteResult>> {
    Ok(Json(state.stores.votes.result(question_id).await?))
}

/// Delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.stores.comments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Text comments on a user's live questions
pub async fn user_text_comments(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(
        state.stores.comments.list_for_user(user_id, CommentKind::Text).await?,
    ))
}

/// Finished voice comments on a user's live questions
pub async fn user_audio_comments(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(
        state.stores.comments.list_for_user(user_id, CommentKind::Audio).await?,
    ))
}

/// Results of a user's live vote questions
pub async fn user_vote_results(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<VoteResult>>> {
    Ok(Json(state.stores.votes.results_for_user(user_id).await?))
}
