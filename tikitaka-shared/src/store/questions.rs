/// Question store
///
/// Creation-time validation and the lazy expiry engine. No background sweep
/// exists: list and get paths that report liveness re-check age and persist
/// the `expired` flip as part of the read. History reads opt out of the flip.
/// Age is measured on the database clock, the one that stamps `created_at`.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::clock;
use crate::error::{StoreError, StoreResult};
use crate::lifecycle::{self, ExpiryStatus};
use crate::limits::Limits;
use crate::models::question::{CommentPolicy, NewQuestion, Question, QuestionKind};
use crate::store::users::UserStore;

/// Parses a question kind, mapping unknown names to `UnsupportedType`
pub fn parse_question_kind(value: &str) -> StoreResult<QuestionKind> {
    value
        .parse()
        .map_err(|_| StoreError::UnsupportedType(format!("question type: {}", value)))
}

/// Parses a comment policy, mapping unknown names to `UnsupportedType`
pub fn parse_comment_policy(value: &str) -> StoreResult<CommentPolicy> {
    value
        .parse()
        .map_err(|_| StoreError::UnsupportedType(format!("comment type: {}", value)))
}

/// Question store
#[derive(Debug, Clone)]
pub struct QuestionStore {
    db: PgPool,
    limits: Limits,
    users: UserStore,
}

impl QuestionStore {
    /// Creates a new question store
    pub fn new(db: PgPool, limits: Limits) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            db,
            limits,
        }
    }

    /// Creates a normal or challenge question
    ///
    /// `kind` and `comment_policy` are the raw names submitted by the caller.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Gone` if the user is not active
    /// - `UnsupportedType` if the kind or policy is unknown, or the kind is
    ///   `vote` (vote questions are created through `VoteStore`)
    /// - `LengthExceeded` if the content is over the question limit
    pub async fn create(
        &self,
        user_id: Uuid,
        kind: &str,
        comment_policy: &str,
        content: &str,
    ) -> StoreResult<Question> {
        self.users.get(user_id).await?;

        let kind = parse_question_kind(kind)?;
        if kind.is_vote() {
            return Err(StoreError::UnsupportedType(
                "question type: vote questions need options".to_string(),
            ));
        }
        let comment_policy = parse_comment_policy(comment_policy)?;
        lifecycle::ensure_length("question content", content, self.limits.question_content)?;

        let question = Question::create(
            &self.db,
            NewQuestion {
                user_id,
                content: content.to_string(),
                kind,
                comment_policy: Some(comment_policy),
            },
        )
        .await?;

        info!(question_id = %question.id, user_id = %user_id, kind = %kind, "Question created");
        Ok(question)
    }

    /// Gets a question in whatever state it is in
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Question>> {
        Ok(Question::find_by_id(&self.db, id).await?)
    }

    /// Lists every question of a user
    pub async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Question>> {
        Ok(Question::list_by_user(&self.db, user_id).await?)
    }

    /// Lists a user's live questions, vote questions when `vote` is true and
    /// every other kind otherwise
    ///
    /// Questions found past their window are flipped to expired (and
    /// excluded) in the same transaction as the listing.
    pub async fn list_live_by_user(&self, user_id: Uuid, vote: bool) -> StoreResult<Vec<Question>> {
        let mut tx = self.db.begin().await?;
        let cutoff = lifecycle::expiry_cutoff(clock::now(&mut *tx).await?, self.limits.expiry_window);
        let expired = Question::expire_due_for_user(&mut *tx, user_id, cutoff).await?;
        let questions = Question::list_unexpired_by_user(&mut *tx, user_id, vote).await?;
        tx.commit().await?;

        if expired > 0 {
            info!(user_id = %user_id, expired, "Expired questions observed on listing");
        }
        Ok(questions)
    }

    /// Lists a user's expired, non-deleted questions, newest first
    ///
    /// Read-only: questions past their window are reported but their flag is
    /// left as persisted.
    pub async fn list_expired_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Question>> {
        let cutoff = lifecycle::expiry_cutoff(clock::now(&self.db).await?, self.limits.expiry_window);
        Ok(Question::list_expired_by_user(&self.db, user_id, cutoff).await?)
    }

    /// Gets a question that is still live
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `Gone` if soft-deleted
    /// - `Expired` if already flagged, or if it is past its window, in which
    ///   case the flag is persisted before returning
    pub async fn get_live(&self, id: Uuid) -> StoreResult<Question> {
        let question = Question::find_by_id(&self.db, id)
            .await?
            .ok_or(StoreError::NotFound("question"))?;

        if question.is_deleted {
            return Err(StoreError::Gone("question"));
        }

        let now = clock::now(&self.db).await?;
        match lifecycle::expiry_status(&question, now, self.limits.expiry_window) {
            ExpiryStatus::Live => Ok(question),
            ExpiryStatus::AlreadyExpired => Err(StoreError::Expired),
            ExpiryStatus::Due => {
                if Question::mark_expired(&self.db, id).await?.is_some() {
                    info!(question_id = %id, "Question expired on read");
                }
                Err(StoreError::Expired)
            }
        }
    }

    /// Picks a random live question of a kind
    pub async fn random_live(&self, kind: QuestionKind) -> StoreResult<Option<Question>> {
        let cutoff = lifecycle::expiry_cutoff(clock::now(&self.db).await?, self.limits.expiry_window);
        let question = Question::random_live_by_kind(&self.db, kind, cutoff).await?;

        debug!(kind = %kind, found = question.is_some(), "Random question lookup");
        Ok(question)
    }

    /// Soft-deletes a question
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `AlreadyDeleted` if already soft-deleted.
    pub async fn soft_delete(&self, id: Uuid) -> StoreResult<()> {
        let question = Question::find_by_id(&self.db, id)
            .await?
            .ok_or(StoreError::NotFound("question"))?;

        if question.is_deleted || !Question::mark_deleted(&self.db, id).await? {
            return Err(StoreError::AlreadyDeleted("question"));
        }

        info!(question_id = %id, "Question soft-deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_kind() {
        assert_eq!(parse_question_kind("challenge").unwrap(), QuestionKind::Challenge);
        assert!(matches!(
            parse_question_kind("n"),
            Err(StoreError::UnsupportedType(msg)) if msg == "question type: n"
        ));
    }

    #[test]
    fn test_parse_comment_policy() {
        assert_eq!(parse_comment_policy("either").unwrap(), CommentPolicy::Either);
        assert!(matches!(
            parse_comment_policy("video"),
            Err(StoreError::UnsupportedType(_))
        ));
    }
}
