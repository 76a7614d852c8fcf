/// Comment store
///
/// Text comments are checked against the question's liveness and policy and
/// created complete. Audio comments go through two steps: a placeholder is
/// created up front, then `finalize_audio` attaches the asset URL once the
/// recording has been processed and uploaded.

use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::lifecycle;
use crate::limits::Limits;
use crate::models::comment::{Comment, CommentKind};
use crate::models::question::Question;
use crate::store::questions::QuestionStore;

/// Comment store
#[derive(Debug, Clone)]
pub struct CommentStore {
    db: PgPool,
    limits: Limits,
    questions: QuestionStore,
}

impl CommentStore {
    /// Creates a new comment store
    pub fn new(db: PgPool, limits: Limits) -> Self {
        Self {
            questions: QuestionStore::new(db.clone(), limits),
            db,
            limits,
        }
    }

    /// Creates a text comment on a live question
    ///
    /// # Errors
    ///
    /// - `LengthExceeded` if the content is over the comment limit
    /// - `NotFound` / `Gone` / `Expired` from the liveness check
    /// - `UnsupportedCommentType` if the question does not take text
    pub async fn create_text(&self, question_id: Uuid, content: &str) -> StoreResult<Comment> {
        lifecycle::ensure_length("comment content", content, self.limits.comment_content)?;

        let question = self.questions.get_live(question_id).await?;
        lifecycle::ensure_accepts(&question, CommentKind::Text)?;

        let comment = Comment::create(&self.db, question_id, CommentKind::Text, content).await?;

        info!(comment_id = %comment.id, question_id = %question_id, "Text comment created");
        Ok(comment)
    }

    /// Creates an empty audio comment to be finalized later
    ///
    /// # Errors
    ///
    /// - `NotFound` if the question does not exist
    /// - `UnsupportedCommentType` if the question does not take audio
    pub async fn create_audio_placeholder(&self, question_id: Uuid) -> StoreResult<Comment> {
        let question = Question::find_by_id(&self.db, question_id)
            .await?
            .ok_or(StoreError::NotFound("question"))?;
        lifecycle::ensure_accepts(&question, CommentKind::Audio)?;

        let comment = Comment::create(&self.db, question_id, CommentKind::Audio, "").await?;

        debug!(comment_id = %comment.id, question_id = %question_id, "Audio placeholder created");
        Ok(comment)
    }

    /// Attaches the asset URL to an audio placeholder
    ///
    /// A comment that is already finalized is returned unchanged. Returns
    /// `None` if the comment has been deleted in the meantime.
    pub async fn finalize_audio(&self, comment_id: Uuid, asset_url: &str) -> StoreResult<Option<Comment>> {
        if let Some(comment) = Comment::finalize_audio(&self.db, comment_id, asset_url).await? {
            info!(comment_id = %comment_id, "Audio comment finalized");
            return Ok(Some(comment));
        }

        let existing = Comment::find_by_id(&self.db, comment_id).await?;
        match &existing {
            Some(_) => warn!(comment_id = %comment_id, "Audio comment already finalized"),
            None => debug!(comment_id = %comment_id, "Audio comment gone before finalize"),
        }
        Ok(existing)
    }

    /// Gets a comment
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(Comment::find_by_id(&self.db, id).await?)
    }

    /// Lists the comments of a question in insertion order
    ///
    /// # Errors
    ///
    /// `NotFound` if the question does not exist.
    pub async fn list_by_question(&self, question_id: Uuid) -> StoreResult<Vec<Comment>> {
        if Question::find_by_id(&self.db, question_id).await?.is_none() {
            return Err(StoreError::NotFound("question"));
        }

        Ok(Comment::list_by_question(&self.db, question_id).await?)
    }

    /// Lists comments of one kind on a user's live non-vote questions
    ///
    /// Pending audio placeholders are left out.
    pub async fn list_for_user(&self, user_id: Uuid, kind: CommentKind) -> StoreResult<Vec<Comment>> {
        let questions = self.questions.list_live_by_user(user_id, false).await?;
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        Ok(Comment::list_by_questions_and_kind(&self.db, &ids, kind).await?)
    }

    /// Hard-deletes a comment
    ///
    /// # Errors
    ///
    /// `NotFound` if the comment does not exist.
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        if !Comment::delete(&self.db, id).await? {
            return Err(StoreError::NotFound("comment"));
        }

        info!(comment_id = %id, "Comment deleted");
        Ok(())
    }
}
