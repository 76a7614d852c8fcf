/// Comment model and database operations
///
/// Comments answer a non-vote question. Text comments are created complete.
/// Audio comments are created as an empty placeholder and receive their asset
/// URL exactly once, after out-of-band processing. Comments are hard-deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE comment_kind AS ENUM ('text', 'audio');
///
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     seq BIGSERIAL NOT NULL,
///     question_id UUID NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
///     kind comment_kind NOT NULL,
///     content VARCHAR(1024) NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::question::UnknownVariant;

/// Comment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Text comment
    Text,

    /// Pitch-shifted voice recording, content is the asset URL
    Audio,
}

impl CommentKind {
    /// Converts kind to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentKind::Text => "text",
            CommentKind::Audio => "audio",
        }
    }
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(CommentKind::Text),
            "audio" => Ok(CommentKind::Audio),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique comment ID
    pub id: Uuid,

    /// Question this comment answers
    pub question_id: Uuid,

    /// Comment kind
    pub kind: CommentKind,

    /// Text, or the asset URL for a finalized audio comment
    ///
    /// Empty for an audio placeholder.
    pub content: String,

    /// When the comment was created
    pub created_at: DateTime<Utc>,

    /// When the comment was last updated
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Audio comment still waiting for its asset URL
    pub fn is_placeholder(&self) -> bool {
        self.kind == CommentKind::Audio && self.content.is_empty()
    }

    /// Inserts a comment
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        question_id: Uuid,
        kind: CommentKind,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (question_id, kind, content)
            VALUES ($1, $2, $3)
            RETURNING id, question_id, kind, content, created_at, updated_at
            "#,
        )
        .bind(question_id)
        .bind(kind)
        .bind(content)
        .fetch_one(executor)
        .await?;

        Ok(comment)
    }

    /// Finds a comment by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, question_id, kind, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(comment)
    }

    /// Lists the comments of a question in insertion order
    pub async fn list_by_question<'e, E: PgExecutor<'e>>(
        executor: E,
        question_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, question_id, kind, content, created_at, updated_at
            FROM comments
            WHERE question_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(question_id)
        .fetch_all(executor)
        .await?;

        Ok(comments)
    }

    /// Lists comments of one kind across several questions in insertion order
    ///
    /// Audio placeholders are skipped.
    pub async fn list_by_questions_and_kind<'e, E: PgExecutor<'e>>(
        executor: E,
        question_ids: &[Uuid],
        kind: CommentKind,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, question_id, kind, content, created_at, updated_at
            FROM comments
            WHERE question_id = ANY($1)
              AND kind = $2
              AND NOT (kind = 'audio' AND content = '')
            ORDER BY seq ASC
            "#,
        )
        .bind(question_ids)
        .bind(kind)
        .fetch_all(executor)
        .await?;

        Ok(comments)
    }

    /// Attaches the asset URL to an audio placeholder
    ///
    /// Only matches an audio comment whose content is still empty, so a
    /// finalized comment is never rewritten. Returns None when nothing matched.
    pub async fn finalize_audio<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        asset_url: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1 AND kind = 'audio' AND content = ''
            RETURNING id, question_id, kind, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(asset_url)
        .fetch_optional(executor)
        .await?;

        Ok(comment)
    }

    /// Hard-deletes a comment
    ///
    /// Returns false if the comment did not exist.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(kind: CommentKind, content: &str) -> Comment {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            kind,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_comment_kind_parse() {
        assert_eq!("text".parse::<CommentKind>(), Ok(CommentKind::Text));
        assert_eq!("audio".parse::<CommentKind>(), Ok(CommentKind::Audio));
        assert!("sound".parse::<CommentKind>().is_err());
    }

    #[test]
    fn test_is_placeholder() {
        assert!(comment(CommentKind::Audio, "").is_placeholder());
        assert!(!comment(CommentKind::Audio, "https://bucket/abc").is_placeholder());
        assert!(!comment(CommentKind::Text, "").is_placeholder());
    }
}
