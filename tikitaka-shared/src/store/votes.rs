/// Vote store
///
/// Vote questions are created together with their options in one
/// transaction. Tally increments are a single conditional `UPDATE`, so
/// concurrent votes on the same option never lose an increment.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::lifecycle::{self, VoteResult};
use crate::limits::Limits;
use crate::models::question::{NewQuestion, Question, QuestionKind};
use crate::models::vote_option::VoteOption;
use crate::store::questions::QuestionStore;
use crate::store::users::UserStore;

/// Vote store
#[derive(Debug, Clone)]
pub struct VoteStore {
    db: PgPool,
    limits: Limits,
    users: UserStore,
    questions: QuestionStore,
}

impl VoteStore {
    /// Creates a new vote store
    pub fn new(db: PgPool, limits: Limits) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            questions: QuestionStore::new(db.clone(), limits),
            db,
            limits,
        }
    }

    /// Creates a vote question and its options
    ///
    /// Options get positions 1..=n in the order given. Nothing is written if
    /// any step fails.
    ///
    /// # Errors
    ///
    /// - `LengthExceeded` if the question or any option is too long
    /// - `InvalidOptionCount` if fewer than 2 or more than 4 options
    /// - `NotFound` / `Gone` if the user is not active
    pub async fn create_vote_question(
        &self,
        user_id: Uuid,
        content: &str,
        options: &[String],
    ) -> StoreResult<(Question, Vec<VoteOption>)> {
        lifecycle::validate_vote(content, options, &self.limits)?;
        self.users.get(user_id).await?;

        let mut tx = self.db.begin().await?;

        let question = Question::create(
            &mut *tx,
            NewQuestion {
                user_id,
                content: content.to_string(),
                kind: QuestionKind::Vote,
                comment_policy: None,
            },
        )
        .await?;
        let created = VoteOption::create_batch(&mut *tx, question.id, options).await?;

        tx.commit().await?;

        info!(
            question_id = %question.id,
            user_id = %user_id,
            options = created.len(),
            "Vote question created"
        );
        Ok((question, created))
    }

    /// Lists the options of a vote question in position order
    pub async fn options(&self, question_id: Uuid) -> StoreResult<Vec<VoteOption>> {
        Ok(VoteOption::list_by_question(&self.db, question_id).await?)
    }

    /// Casts one vote
    ///
    /// # Errors
    ///
    /// `NotFound` if the option does not exist.
    pub async fn increment(&self, option_id: Uuid) -> StoreResult<VoteOption> {
        let option = VoteOption::increment_tally(&self.db, option_id)
            .await?
            .ok_or(StoreError::NotFound("vote option"))?;

        debug!(option_id = %option_id, tally = option.tally, "Vote cast");
        Ok(option)
    }

    /// Aggregated result of one vote question
    ///
    /// # Errors
    ///
    /// `NotFound` if the question is absent, is not a vote question, or has
    /// no options.
    pub async fn result(&self, question_id: Uuid) -> StoreResult<VoteResult> {
        let question = Question::find_by_id(&self.db, question_id)
            .await?
            .ok_or(StoreError::NotFound("question"))?;

        if !question.kind.is_vote() {
            return Err(StoreError::NotFound("vote question"));
        }

        let options = VoteOption::list_by_question(&self.db, question_id).await?;
        lifecycle::aggregate_votes(&question, options)
    }

    /// Aggregated results of a user's live vote questions, oldest first
    ///
    /// Goes through the same observe-and-expire step as the live listing.
    pub async fn results_for_user(&self, user_id: Uuid) -> StoreResult<Vec<VoteResult>> {
        let questions = self.questions.list_live_by_user(user_id, true).await?;
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let mut by_question: HashMap<Uuid, Vec<VoteOption>> = HashMap::new();
        for option in VoteOption::list_by_questions(&self.db, &ids).await? {
            by_question.entry(option.question_id).or_default().push(option);
        }

        questions
            .iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                lifecycle::aggregate_votes(question, options)
            })
            .collect()
    }
}
