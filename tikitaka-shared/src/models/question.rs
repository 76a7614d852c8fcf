/// Question model and database operations
///
/// A question is owned by a user and has a kind (normal, challenge, vote).
/// Non-vote questions declare which comment kinds they accept; vote questions
/// carry options instead and store no comment policy.
///
/// # Lifecycle
///
/// ```text
/// live ──(age > window, observed on read)──> expired
/// live | expired ──(soft delete)──> deleted
/// ```
///
/// The expiry flip happens at most once: every update below is conditional on
/// `expired = FALSE`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE question_kind AS ENUM ('normal', 'challenge', 'vote');
/// CREATE TYPE comment_policy AS ENUM ('text', 'audio', 'either');
///
/// CREATE TABLE questions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     content VARCHAR(500) NOT NULL,
///     kind question_kind NOT NULL,
///     comment_policy comment_policy,
///     expired BOOLEAN NOT NULL DEFAULT FALSE,
///     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK ((kind = 'vote') = (comment_policy IS NULL))
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Question kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Free-form question answered with comments
    Normal,

    /// Challenge prompt answered with comments
    Challenge,

    /// Vote question answered by incrementing option tallies
    Vote,
}

impl QuestionKind {
    /// Converts kind to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Normal => "normal",
            QuestionKind::Challenge => "challenge",
            QuestionKind::Vote => "vote",
        }
    }

    /// Whether questions of this kind take options rather than comments
    pub fn is_vote(&self) -> bool {
        matches!(self, QuestionKind::Vote)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(QuestionKind::Normal),
            "challenge" => Ok(QuestionKind::Challenge),
            "vote" => Ok(QuestionKind::Vote),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Which comment kinds a non-vote question accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comment_policy", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentPolicy {
    /// Text comments only
    Text,

    /// Audio comments only
    Audio,

    /// Text or audio comments
    Either,
}

impl CommentPolicy {
    /// Converts policy to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentPolicy::Text => "text",
            CommentPolicy::Audio => "audio",
            CommentPolicy::Either => "either",
        }
    }
}

impl fmt::Display for CommentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(CommentPolicy::Text),
            "audio" => Ok(CommentPolicy::Audio),
            "either" => Ok(CommentPolicy::Either),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A string that names no member of a closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// Question row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    /// Unique question ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Question text
    pub content: String,

    /// Question kind
    pub kind: QuestionKind,

    /// Accepted comment kinds (None for vote questions)
    pub comment_policy: Option<CommentPolicy>,

    /// Whether the question has been observed past its time window
    pub expired: bool,

    /// Soft-delete flag
    pub is_deleted: bool,

    /// When the question was created (start of its time window)
    pub created_at: DateTime<Utc>,

    /// When the question was last updated
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Not soft-deleted and not marked expired
    ///
    /// Does not look at the clock; see `lifecycle::expiry_status` for that.
    pub fn is_live(&self) -> bool {
        !self.is_deleted && !self.expired
    }
}

/// Input for inserting a question
#[derive(Debug, Clone)]
pub struct NewQuestion {
    /// Owning user
    pub user_id: Uuid,

    /// Question text
    pub content: String,

    /// Question kind
    pub kind: QuestionKind,

    /// Accepted comment kinds (None for vote questions)
    pub comment_policy: Option<CommentPolicy>,
}

impl Question {
    /// Inserts a question
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewQuestion,
    ) -> Result<Self, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (user_id, content, kind, comment_policy)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, content, kind, comment_policy, expired, is_deleted,
                      created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.content)
        .bind(data.kind)
        .bind(data.comment_policy)
        .fetch_one(executor)
        .await?;

        Ok(question)
    }

    /// Finds a question by ID regardless of state
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, user_id, content, kind, comment_policy, expired, is_deleted,
                   created_at, updated_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(question)
    }

    /// Lists every question of a user, oldest first
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, user_id, content, kind, comment_policy, expired, is_deleted,
                   created_at, updated_at
            FROM questions
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(questions)
    }

    /// Lists a user's questions that are neither deleted nor marked expired
    ///
    /// `vote` selects vote questions when true and every other kind when false.
    pub async fn list_unexpired_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        vote: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, user_id, content, kind, comment_policy, expired, is_deleted,
                   created_at, updated_at
            FROM questions
            WHERE user_id = $1
              AND (kind = 'vote') = $2
              AND is_deleted = FALSE
              AND expired = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(vote)
        .fetch_all(executor)
        .await?;

        Ok(questions)
    }

    /// Lists a user's non-deleted questions that are expired, either by flag
    /// or by age (created before `cutoff`)
    ///
    /// Read-only: nothing is flipped.
    pub async fn list_expired_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, user_id, content, kind, comment_policy, expired, is_deleted,
                   created_at, updated_at
            FROM questions
            WHERE user_id = $1
              AND is_deleted = FALSE
              AND (expired = TRUE OR created_at < $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(cutoff)
        .fetch_all(executor)
        .await?;

        Ok(questions)
    }

    /// Picks a random live question of a kind created at or after `cutoff`
    pub async fn random_live_by_kind<'e, E: PgExecutor<'e>>(
        executor: E,
        kind: QuestionKind,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, user_id, content, kind, comment_policy, expired, is_deleted,
                   created_at, updated_at
            FROM questions
            WHERE kind = $1
              AND is_deleted = FALSE
              AND expired = FALSE
              AND created_at >= $2
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(cutoff)
        .fetch_optional(executor)
        .await?;

        Ok(question)
    }

    /// Flips `expired` on a single question
    ///
    /// Returns None if the question is missing or was already expired, so
    /// concurrent observers flip it exactly once.
    pub async fn mark_expired<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET expired = TRUE, updated_at = NOW()
            WHERE id = $1 AND expired = FALSE
            RETURNING id, user_id, content, kind, comment_policy, expired, is_deleted,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(question)
    }

    /// Flips `expired` on every live question of a user created before `cutoff`
    ///
    /// Returns the number of questions flipped.
    pub async fn expire_due_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET expired = TRUE, updated_at = NOW()
            WHERE user_id = $1
              AND expired = FALSE
              AND is_deleted = FALSE
              AND created_at < $2
            "#,
        )
        .bind(user_id)
        .bind(cutoff)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sets the soft-delete flag on one question
    ///
    /// Returns false if the question was missing or already deleted.
    pub async fn mark_deleted<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the soft-delete flag on every non-deleted question of a user
    ///
    /// Already-deleted questions keep their original `updated_at`.
    pub async fn mark_deleted_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_kind_round_trip_names() {
        for kind in [QuestionKind::Normal, QuestionKind::Challenge, QuestionKind::Vote] {
            assert_eq!(kind.as_str().parse::<QuestionKind>(), Ok(kind));
        }
        assert_eq!(
            "poll".parse::<QuestionKind>(),
            Err(UnknownVariant("poll".to_string()))
        );
    }

    #[test]
    fn test_comment_policy_parse() {
        assert_eq!("text".parse::<CommentPolicy>(), Ok(CommentPolicy::Text));
        assert_eq!("audio".parse::<CommentPolicy>(), Ok(CommentPolicy::Audio));
        assert_eq!("either".parse::<CommentPolicy>(), Ok(CommentPolicy::Either));
        assert!("Text".parse::<CommentPolicy>().is_err());
    }

    #[test]
    fn test_only_vote_is_vote() {
        assert!(QuestionKind::Vote.is_vote());
        assert!(!QuestionKind::Normal.is_vote());
        assert!(!QuestionKind::Challenge.is_vote());
    }

    #[test]
    fn test_serde_names_match_database_names() {
        assert_eq!(
            serde_json::to_value(QuestionKind::Challenge).unwrap(),
            serde_json::json!("challenge")
        );
        assert_eq!(
            serde_json::to_value(CommentPolicy::Either).unwrap(),
            serde_json::json!("either")
        );
    }

    #[test]
    fn test_is_live() {
        let now = Utc::now();
        let mut question = Question {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "hi".to_string(),
            kind: QuestionKind::Normal,
            comment_policy: Some(CommentPolicy::Text),
            expired: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        assert!(question.is_live());

        question.expired = true;
        assert!(!question.is_live());

        question.expired = false;
        question.is_deleted = true;
        assert!(!question.is_live());
    }
}
