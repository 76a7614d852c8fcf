/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every `ApiError` turns into a JSON body
/// `{ "error": <code>, "message": <text>, "details": [...]? }` with its own
/// status code. Store errors convert one-to-one.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::{Path, State}, Json};
/// use tikitaka_api::{app::AppState, error::ApiResult};
/// use tikitaka_shared::models::user::User;
/// use uuid::Uuid;
///
/// async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<User>> {
///     Ok(Json(state.stores.users.get(id).await?))
/// }
/// ```

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tikitaka_shared::error::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (400)
    BadRequest(String),

    /// Entity does not exist (404)
    NotFound(String),

    /// Entity has been soft-deleted (410)
    Gone(String),

    /// Soft delete of an already-deleted entity (410)
    AlreadyDeleted(String),

    /// Uniqueness violation (409)
    Conflict(String),

    /// Question past its time window (403)
    Expired(String),

    /// Unknown or disallowed question kind / comment policy (415)
    UnsupportedType(String),

    /// Comment kind refused by the question's policy (415)
    UnsupportedCommentType(String),

    /// Content over its length limit (422)
    LengthExceeded(String),

    /// Vote question with too few or too many options (422)
    InvalidOptionCount(String),

    /// Request body failed validation (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Identity provider failure (502)
    IdentityProvider(String),

    /// Object storage failure (502)
    Storage(String),

    /// Audio transform failure (502)
    Media(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "not_found", "expired")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Status code and error code for this variant
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Gone(_) => (StatusCode::GONE, "gone"),
            ApiError::AlreadyDeleted(_) => (StatusCode::GONE, "already_deleted"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Expired(_) => (StatusCode::FORBIDDEN, "expired"),
            ApiError::UnsupportedType(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_type"),
            ApiError::UnsupportedCommentType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_comment_type")
            }
            ApiError::LengthExceeded(_) => (StatusCode::UNPROCESSABLE_ENTITY, "length_exceeded"),
            ApiError::InvalidOptionCount(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_option_count")
            }
            ApiError::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::IdentityProvider(_) => (StatusCode::BAD_GATEWAY, "identity_provider_error"),
            ApiError::Storage(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            ApiError::Media(_) => (StatusCode::BAD_GATEWAY, "media_error"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Gone(msg) => write!(f, "Gone: {}", msg),
            ApiError::AlreadyDeleted(msg) => write!(f, "Already deleted: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Expired(msg) => write!(f, "Expired: {}", msg),
            ApiError::UnsupportedType(msg) => write!(f, "Unsupported type: {}", msg),
            ApiError::UnsupportedCommentType(msg) => write!(f, "Unsupported comment type: {}", msg),
            ApiError::LengthExceeded(msg) => write!(f, "Length exceeded: {}", msg),
            ApiError::InvalidOptionCount(msg) => write!(f, "Invalid option count: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::IdentityProvider(msg) => write!(f, "Identity provider error: {}", msg),
            ApiError::Storage(msg) => write!(f, "Storage error: {}", msg),
            ApiError::Media(msg) => write!(f, "Media error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Request validation failed".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                // logged, never exposed
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::IdentityProvider(msg) | ApiError::Storage(msg) | ApiError::Media(msg) => {
                tracing::warn!(code, "Upstream failure: {}", msg);
                (msg, None)
            }
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Gone(msg)
            | ApiError::AlreadyDeleted(msg)
            | ApiError::Conflict(msg)
            | ApiError::Expired(msg)
            | ApiError::UnsupportedType(msg)
            | ApiError::UnsupportedCommentType(msg)
            | ApiError::LengthExceeded(msg)
            | ApiError::InvalidOptionCount(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(message),
            StoreError::Gone(_) => ApiError::Gone(message),
            StoreError::AlreadyDeleted(_) => ApiError::AlreadyDeleted(message),
            StoreError::Conflict(_) => ApiError::Conflict(message),
            StoreError::UnsupportedType(_) => ApiError::UnsupportedType(message),
            StoreError::UnsupportedCommentType(_) => ApiError::UnsupportedCommentType(message),
            StoreError::LengthExceeded { .. } => ApiError::LengthExceeded(message),
            StoreError::InvalidOptionCount { .. } => ApiError::InvalidOptionCount(message),
            StoreError::Expired => ApiError::Expired(message),
            StoreError::IdentityProvider(_) => ApiError::IdentityProvider(message),
            StoreError::Storage(_) => ApiError::Storage(message),
            StoreError::Media(_) => ApiError::Media(message),
            StoreError::Database(e) => ApiError::from(e),
        }
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ApiError::ServiceUnavailable("Database unavailable".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

/// Convert multipart parsing errors to API errors
impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}
