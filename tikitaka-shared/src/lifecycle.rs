/// Lifecycle and aggregation rules
///
/// Pure functions shared by the stores. Nothing here touches the database:
/// callers fetch rows, ask these rules what to do, then persist.
///
/// - Lazy expiry: a question is due to expire once strictly more than the
///   expiry window has passed since `created_at`.
/// - Comment acceptance: a comment kind must match the question's policy
///   (or the policy is `either`); vote questions accept no comments.
/// - Input validation: content lengths and option counts against `Limits`.
/// - Vote aggregation: tallies in position order, `updated_at` is the most
///   recent vote cast.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::limits::Limits;
use crate::models::comment::CommentKind;
use crate::models::question::{CommentPolicy, Question, QuestionKind};
use crate::models::vote_option::VoteOption;

/// What a read observes about a question's time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// Within its window
    Live,

    /// Already flagged expired; nothing to persist
    AlreadyExpired,

    /// Past its window but not yet flagged; the observer should flip it
    Due,
}

/// Oldest `created_at` that is still live at `now`
///
/// A question is past its window iff `created_at < expiry_cutoff(now, window)`.
pub fn expiry_cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now - window
}

/// Whether strictly more than `window` has elapsed since `created_at`
pub fn is_past_window(created_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - created_at > window
}

/// Classifies a question for the observe-and-expire step
pub fn expiry_status(question: &Question, now: DateTime<Utc>, window: Duration) -> ExpiryStatus {
    if question.expired {
        ExpiryStatus::AlreadyExpired
    } else if is_past_window(question.created_at, now, window) {
        ExpiryStatus::Due
    } else {
        ExpiryStatus::Live
    }
}

/// Policy check for a new comment
pub fn ensure_accepts(question: &Question, kind: CommentKind) -> StoreResult<()> {
    let accepted = match (question.kind, question.comment_policy) {
        (QuestionKind::Vote, _) | (_, None) => false,
        (_, Some(CommentPolicy::Either)) => true,
        (_, Some(CommentPolicy::Text)) => kind == CommentKind::Text,
        (_, Some(CommentPolicy::Audio)) => kind == CommentKind::Audio,
    };

    if accepted {
        Ok(())
    } else {
        Err(StoreError::UnsupportedCommentType(kind))
    }
}

/// Rejects content longer than `limit` characters
pub fn ensure_length(field: &'static str, content: &str, limit: usize) -> StoreResult<()> {
    if content.chars().count() > limit {
        return Err(StoreError::LengthExceeded { field, limit });
    }
    Ok(())
}

/// Validates a vote question and its options before anything is written
pub fn validate_vote(content: &str, options: &[String], limits: &Limits) -> StoreResult<()> {
    ensure_length("vote question content", content, limits.vote_question_content)?;

    for option in options {
        ensure_length("vote option content", option, limits.vote_option_content)?;
    }

    let count = options.len();
    if count < limits.min_options || count > limits.max_options {
        return Err(StoreError::InvalidOptionCount {
            count,
            min: limits.min_options,
            max: limits.max_options,
        });
    }

    Ok(())
}

/// Aggregated view of a vote question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResult {
    /// Vote question ID
    pub question_id: Uuid,

    /// Option texts in position order
    pub options: Vec<String>,

    /// Tallies, index-aligned with `options`
    pub tallies: Vec<i64>,

    /// When the question was created
    pub created_at: DateTime<Utc>,

    /// Most recent `updated_at` among the options
    pub updated_at: DateTime<Utc>,
}

/// Builds the result view of a vote question
///
/// Options may arrive in any order; they are sorted by position. Fails with
/// `NotFound` if the question is not a vote question or has no options.
pub fn aggregate_votes(question: &Question, mut options: Vec<VoteOption>) -> StoreResult<VoteResult> {
    if !question.kind.is_vote() {
        return Err(StoreError::NotFound("vote question"));
    }

    options.sort_by_key(|option| option.position);

    let updated_at = options
        .iter()
        .map(|option| option.updated_at)
        .max()
        .ok_or(StoreError::NotFound("vote options"))?;

    let (contents, tallies): (Vec<String>, Vec<i64>) = options
        .into_iter()
        .map(|option| (option.content, option.tally))
        .unzip();

    Ok(VoteResult {
        question_id: question.id,
        options: contents,
        tallies,
        created_at: question.created_at,
        updated_at,
    })
}
