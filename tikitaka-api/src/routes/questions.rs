/// Question endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/questions` - Create a normal or challenge question
/// - `POST /api/v1/questions/vote` - Create a vote question with its options
/// - `GET /api/v1/questions/random?kind=` - Random live question of a kind
/// - `GET /api/v1/questions/history/:user_id` - A user's expired questions
/// - `GET /api/v1/questions/users/:user_id` - A user's questions
/// - `GET /api/v1/questions/:id` - A question in any state
/// - `GET /api/v1/questions/:id/live` - A question that is still live
/// - `GET /api/v1/questions/:id/options` - Options of a vote question
/// - `DELETE /api/v1/questions/:id` - Soft-delete a question

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tikitaka_shared::{
    models::{question::Question, vote_option::VoteOption},
    store::questions::parse_question_kind,
};
use uuid::Uuid;
use validator::Validate;

/// Create question request
///
/// `kind` and `comment_policy` are checked by the store so that unknown
/// values surface as `unsupported_type`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub user_id: Uuid,

    /// `normal` or `challenge`
    pub kind: String,

    /// `text`, `audio` or `either`
    pub comment_policy: String,

    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
}

/// Create vote question request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVoteQuestionRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,

    /// Option texts in display order
    pub options: Vec<String>,
}

/// Vote question with its options
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteQuestionResponse {
    pub question: Question,
    pub options: Vec<VoteOption>,
}

/// Random question query
#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    pub kind: String,
}

/// User question listing query
#[derive(Debug, Deserialize)]
pub struct UserQuestionsQuery {
    /// When present, only live questions are listed: vote questions for
    /// `true`, every other kind for `false`
    pub vote: Option<bool>,
}

/// Create a normal or challenge question
///
/// # Request
///
/// ```json
/// {
///   "user_id": "…",
///   "kind": "normal",
///   "comment_policy": "either",
///   "content": "Best pizza topping?"
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found` / `410 Gone`: The user is missing or deleted
/// - `415 Unsupported Media Type`: Unknown kind or policy, or kind `vote`
/// - `422 Unprocessable Entity`: Content too long
pub async fn create_question(
    State(state): State<AppState>,
    Json(req): Json<CreateQuestionRequest>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    req.validate()?;

    let question = state
        .stores
        .questions
        .create(req.user_id, &req.kind, &req.comment_policy, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Create a vote question and its options in one transaction
///
/// # Errors
///
/// - `404 Not Found` / `410 Gone`: The user is missing or deleted
/// - `422 Unprocessable Entity`: Wrong number of options, or content too long
pub async fn create_vote_question(
    State(state): State<AppState>,
    Json(req): Json<CreateVoteQuestionRequest>,
) -> ApiResult<(StatusCode, Json<VoteQuestionResponse>)> {
    req.validate()?;

    let (question, options) = state
        .stores
        .votes
        .create_vote_question(req.user_id, &req.content, &req.options)
        .await?;

    Ok((StatusCode::CREATED, Json(VoteQuestionResponse { question, options })))
}

/// Random live question of a kind
pub async fn random_question(
    State(state): State<AppState>,
    Query(query): Query<RandomQuery>,
) -> ApiResult<Json<Question>> {
    let kind = parse_question_kind(&query.kind)?;

    state
        .stores
        .questions
        .random_live(kind)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no live {} question", kind)))
}

/// A user's expired questions, newest first
pub async fn question_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Question>>> {
    Ok(Json(state.stores.questions.list_expired_by_user(user_id).await?))
}

/// A user's questions
///
/// Without `vote` every question is listed in whatever state it is in. With
/// `vote`, questions past their window are expired first and only live ones
/// are returned.
pub async fn user_questions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<UserQuestionsQuery>,
) -> ApiResult<Json<Vec<Question>>> {
    let questions = match query.vote {
        Some(vote) => state.stores.questions.list_live_by_user(user_id, vote).await?,
        None => state.stores.questions.list_by_user(user_id).await?,
    };

    Ok(Json(questions))
}

/// A question in any state
///
/// # Errors
///
/// - `404 Not Found`: No such question
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Question>> {
    state
        .stores
        .questions
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("question not found".to_string()))
}

/// A question that is still live
///
/// # Errors
///
/// - `404 Not Found`: No such question
/// - `410 Gone`: The question was deleted
/// - `403 Forbidden`: The question has expired (`expired`)
pub async fn get_live_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Question>> {
    Ok(Json(state.stores.questions.get_live(id).await?))
}

/// Options of a vote question in position order
pub async fn question_options(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<VoteOption>>> {
    Ok(Json(state.stores.votes.options(id).await?))
}

/// Soft-delete a question
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.stores.questions.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
