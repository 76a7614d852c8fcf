/// Rule layer over the models
///
/// Each store owns a pool handle and the configured `Limits`, validates
/// input, applies the lifecycle rules and maps outcomes to `StoreError`.
/// Operations that write more than one row run in a single transaction.
///
/// # Example
///
/// ```no_run
/// use tikitaka_shared::limits::Limits;
/// use tikitaka_shared::store::Stores;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let stores = Stores::new(pool, Limits::default());
/// let options = vec!["Pizza".to_string(), "Sushi".to_string()];
/// let (question, options) = stores
///     .votes
///     .create_vote_question(user_id, "Lunch?", &options)
///     .await?;
/// stores.votes.increment(options[0].id).await?;
/// let result = stores.votes.result(question.id).await?;
/// assert_eq!(result.tallies, vec![1, 0]);
/// # Ok(())
/// # }
/// ```

pub mod comments;
pub mod questions;
pub mod users;
pub mod votes;

use sqlx::PgPool;

use crate::limits::Limits;

pub use comments::CommentStore;
pub use questions::QuestionStore;
pub use users::UserStore;
pub use votes::VoteStore;

/// All stores over one pool
#[derive(Debug, Clone)]
pub struct Stores {
    pub users: UserStore,
    pub questions: QuestionStore,
    pub votes: VoteStore,
    pub comments: CommentStore,
}

impl Stores {
    pub fn new(db: PgPool, limits: Limits) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            questions: QuestionStore::new(db.clone(), limits),
            votes: VoteStore::new(db.clone(), limits),
            comments: CommentStore::new(db, limits),
        }
    }
}
