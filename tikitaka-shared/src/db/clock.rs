/// Database clock
///
/// `created_at` is stamped by PostgreSQL, so expiry cutoffs are taken from
/// the same clock rather than the application host's.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

/// Current time on the database server
///
/// Inside a transaction this is the transaction start time.
pub async fn now<'e, E: PgExecutor<'e>>(executor: E) -> Result<DateTime<Utc>, sqlx::Error> {
    sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
        .fetch_one(executor)
        .await
}
