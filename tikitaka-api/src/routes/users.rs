/// User endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/users` - Create a user
/// - `PUT /api/v1/users` - Refresh a user's profile, creating it on miss
/// - `POST /api/v1/users/by_access_token` - Link a user from a provider token
/// - `GET /api/v1/users/:id` - Get an active user
/// - `DELETE /api/v1/users/:id` - Soft-delete a user and their questions
/// - `GET /api/v1/users/:id/share/:question_id` - Share link for a question

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
use tikitaka_shared::models::user::{CreateUser, ProfileAttributes, User};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create / update request
#[derive(Debug, Deserialize, Validate)]
pub struct UserRequest {
    /// Account identifier at the identity provider
    #[validate(length(min = 1, max = 64, message = "external_id must be 1 to 64 characters"))]
    pub external_id: String,

    #[validate(length(max = 64, message = "username must be at most 64 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 255, message = "full_name must be at most 255 characters"))]
    pub full_name: Option<String>,

    #[validate(range(min = 0, message = "follower_count must not be negative"))]
    #[serde(default)]
    pub follower_count: i32,

    #[validate(range(min = 0, message = "following_count must not be negative"))]
    #[serde(default)]
    pub following_count: i32,

    #[validate(url(message = "profile_image_url must be a URL"))]
    pub profile_image_url: Option<String>,
}

impl From<UserRequest> for CreateUser {
    fn from(req: UserRequest) -> Self {
        CreateUser {
            external_id: req.external_id,
            profile: ProfileAttributes {
                username: req.username,
                full_name: req.full_name,
                follower_count: req.follower_count,
                following_count: req.following_count,
                profile_image_url: req.profile_image_url,
            },
        }
    }
}

/// Access token query
#[derive(Debug, Deserialize)]
pub struct AccessTokenQuery {
    pub access_token: String,
}

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    /// Deleted user
    pub user_id: Uuid,

    /// Questions soft-deleted along with the user
    pub deleted_questions: u64,
}

/// Share link response
#[derive(Debug, Serialize, Deserialize)]
pub struct ShareLinkResponse {
    pub url: String,
}

/// Create a user
///
/// # Errors
///
/// - `409 Conflict`: A user with this identifier already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = state.stores.users.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Refresh a user's profile, creating (or reviving) the user on miss
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = state.stores.users.link_profile(req.into()).await?;
    Ok(Json(user))
}

/// Link a user from a provider access token
///
/// Fetches the account profile with the token and updates or creates the
/// matching user.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/users/by_access_token?access_token=IGQV...
/// ```
///
/// # Errors
///
/// - `502 Bad Gateway`: The identity provider rejected the token or failed
pub async fn link_by_access_token(
    State(state): State<AppState>,
    Query(query): Query<AccessTokenQuery>,
) -> ApiResult<Json<User>> {
    if query.access_token.trim().is_empty() {
        return Err(ApiError::BadRequest("access_token must not be empty".to_string()));
    }

    let profile = state.identity.fetch_profile(&query.access_token).await?;
    let user = state.stores.users.link_profile(profile).await?;

    info!(user_id = %user.id, "User linked from access token");
    Ok(Json(user))
}

/// Get an active user
///
/// # Errors
///
/// - `404 Not Found`: No such user
/// - `410 Gone`: The user has been deleted
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<User>> {
    Ok(Json(state.stores.users.get(id).await?))
}

/// Soft-delete a user and all of their questions
///
/// # Errors
///
/// - `404 Not Found`: No such user
/// - `410 Gone`: The user was already deleted (`already_deleted`)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteUserResponse>> {
    let deleted_questions = state.stores.users.delete(id).await?;

    Ok(Json(DeleteUserResponse {
        user_id: id,
        deleted_questions,
    }))
}

/// Share link for one of a user's questions
///
/// The link is `<SHARE_BASE_URL>/<external_id>/<question_id>`.
pub async fn share_link(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ShareLinkResponse>> {
    let user = state.stores.users.get(id).await?;

    let question = state
        .stores
        .questions
        .get(question_id)
        .await?
        .filter(|q| q.user_id == user.id)
        .ok_or_else(|| ApiError::NotFound("question not found".to_string()))?;

    if question.is_deleted {
        return Err(ApiError::Gone("question has been deleted".to_string()));
    }

    Ok(Json(ShareLinkResponse {
        url: share_url(&state.config.share_base_url, &user.external_id, question.id),
    }))
}

fn share_url(base: &str, external_id: &str, question_id: Uuid) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), external_id, question_id)
}
