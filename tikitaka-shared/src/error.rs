/// Error taxonomy for the question/comment/vote rule layer
///
/// Every store operation returns `StoreResult<T>`. Lookup and validation
/// failures are surfaced as typed variants; collaborator failures (identity
/// provider, object storage, audio transform) carry the upstream message.
///
/// The API crate maps each variant to a distinct HTTP status and error code.

use crate::models::comment::CommentKind;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the stores and collaborator integrations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Entity exists but has been soft-deleted
    #[error("{0} has been deleted")]
    Gone(&'static str),

    /// Soft delete requested on an entity that is already soft-deleted
    #[error("{0} is already deleted")]
    AlreadyDeleted(&'static str),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Value outside a closed kind/policy set, or a kind not allowed on this path
    #[error("unsupported {0}")]
    UnsupportedType(String),

    /// Question's comment policy does not accept this comment kind
    #[error("question does not accept {0} comments")]
    UnsupportedCommentType(CommentKind),

    /// Content longer than the configured limit (in characters)
    #[error("{field} exceeds length limit of {limit} characters")]
    LengthExceeded {
        /// Which input was too long
        field: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// Vote question created with too few or too many options
    #[error("vote questions need {min} to {max} options, got {count}")]
    InvalidOptionCount {
        /// Options supplied
        count: usize,
        /// Lower bound (inclusive)
        min: usize,
        /// Upper bound (inclusive)
        max: usize,
    },

    /// Question is past its time window
    #[error("question has expired")]
    Expired,

    /// Identity provider exchange or profile fetch failed
    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    /// Object storage upload failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Audio transform failed
    #[error("audio transform failed: {0}")]
    Media(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique-constraint violation to `Conflict`, anything else to `Database`
    pub fn from_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(message.into())
            }
            _ => StoreError::Database(err),
        }
    }
}
