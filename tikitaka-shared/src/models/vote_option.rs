/// Vote option model and database operations
///
/// Options belong to a vote question, are created in one batch with it and
/// are only ever mutated by tally increments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE vote_options (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     question_id UUID NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL CHECK (position >= 1),
///     content VARCHAR(100) NOT NULL,
///     tally BIGINT NOT NULL DEFAULT 0 CHECK (tally >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (question_id, position)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// One choice of a vote question
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteOption {
    /// Unique option ID
    pub id: Uuid,

    /// Parent vote question
    pub question_id: Uuid,

    /// 1-based position, in the order the options were submitted
    pub position: i32,

    /// Option text
    pub content: String,

    /// Votes cast for this option
    pub tally: i64,

    /// When the option was created
    pub created_at: DateTime<Utc>,

    /// When the last vote was cast (creation time if none yet)
    pub updated_at: DateTime<Utc>,
}

impl VoteOption {
    /// Inserts one option per content string, positions 1..=n in input order
    ///
    /// Single statement, so the batch is all-or-nothing even outside a
    /// transaction. The returned options are sorted by position.
    pub async fn create_batch<'e, E: PgExecutor<'e>>(
        executor: E,
        question_id: Uuid,
        contents: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let positions: Vec<i32> = (1..=contents.len() as i32).collect();

        let mut options = sqlx::query_as::<_, VoteOption>(
            r#"
            INSERT INTO vote_options (question_id, position, content)
            SELECT $1, t.position, t.content
            FROM UNNEST($2::INTEGER[], $3::TEXT[]) AS t(position, content)
            RETURNING id, question_id, position, content, tally, created_at, updated_at
            "#,
        )
        .bind(question_id)
        .bind(&positions)
        .bind(contents)
        .fetch_all(executor)
        .await?;

        options.sort_by_key(|option| option.position);
        Ok(options)
    }

    /// Lists the options of a question by position
    pub async fn list_by_question<'e, E: PgExecutor<'e>>(
        executor: E,
        question_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let options = sqlx::query_as::<_, VoteOption>(
            r#"
            SELECT id, question_id, position, content, tally, created_at, updated_at
            FROM vote_options
            WHERE question_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(question_id)
        .fetch_all(executor)
        .await?;

        Ok(options)
    }

    /// Lists the options of several questions, grouped by question then position
    pub async fn list_by_questions<'e, E: PgExecutor<'e>>(
        executor: E,
        question_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let options = sqlx::query_as::<_, VoteOption>(
            r#"
            SELECT id, question_id, position, content, tally, created_at, updated_at
            FROM vote_options
            WHERE question_id = ANY($1)
            ORDER BY question_id, position ASC
            "#,
        )
        .bind(question_ids)
        .fetch_all(executor)
        .await?;

        Ok(options)
    }

    /// Adds one vote and refreshes `updated_at`
    ///
    /// The increment happens inside a single UPDATE, so concurrent votes on
    /// the same option never overwrite each other. Returns None if the option
    /// does not exist.
    pub async fn increment_tally<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let option = sqlx::query_as::<_, VoteOption>(
            r#"
            UPDATE vote_options
            SET tally = tally + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, question_id, position, content, tally, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(option)
    }
}
