/// Database models for Tikitaka
///
/// Row types and their SQL. Functions here take any `PgExecutor` (a pool, a
/// connection or an open transaction) and return raw `sqlx::Error`s; the rules
/// that give those rows meaning live in `store` and `lifecycle`.
///
/// # Models
///
/// - `user`: Accounts linked to an identity provider
/// - `question`: Questions with kind, comment policy, expiry and soft delete
/// - `vote_option`: Ordered choices of a vote question with running tallies
/// - `comment`: Text and audio answers to a question
///
/// # Example
///
/// ```no_run
/// use tikitaka_shared::models::question::Question;
/// use tikitaka_shared::db::pool::{create_pool, PoolConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
/// let questions = Question::list_by_user(&pool, user_id).await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod question;
pub mod user;
pub mod vote_option;
