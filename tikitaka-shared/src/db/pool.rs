/// PostgreSQL connection pool
///
/// # Example
///
/// ```no_run
/// use tikitaka_shared::db::pool::{create_pool, PoolConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(PoolConfig::new("postgresql://tikitaka@localhost/tikitaka")).await?;
///
///     let (live,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE NOT expired")
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection string
    pub url: String,

    /// Upper bound on open connections
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// How long a request waits for a free connection
    pub acquire_timeout: Duration,

    /// Idle connections older than this are closed (None = never)
    pub idle_timeout: Option<Duration>,

    /// Connections are recycled after this long (None = never)
    pub max_lifetime: Option<Duration>,

    /// Ping connections before handing them out
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    /// Default settings for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the maximum pool size
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = self.min_connections.min(max_connections);
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(self.test_before_acquire)
    }
}

/// Connects the pool and verifies the database answers
///
/// # Errors
///
/// Fails if the URL is invalid, the server is unreachable, or the health
/// check query fails.
pub async fn create_pool(config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max = config.max_connections,
        min = config.min_connections,
        acquire_timeout = ?config.acquire_timeout,
        "Connecting to PostgreSQL"
    );

    let pool = config.pool_options().connect(&config.url).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if one != 1 {
        warn!(value = one, "SELECT 1 returned something else");
        return Err(sqlx::Error::Protocol("health check returned unexpected value".into()));
    }

    debug!("PostgreSQL reachable");
    Ok(())
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Connections checked out
    pub active: u32,

    /// Connections idle in the pool
    pub idle: u32,

    /// All open connections
    pub total: u32,
}

pub fn pool_stats(pool: &PgPool) -> PoolStats {
    let total = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        active: total.saturating_sub(idle),
        idle,
        total,
    }
}

/// Closes every connection, waiting for checked-out ones to come back
pub async fn close_pool(pool: PgPool) {
    info!(open = pool.size(), "Draining database pool");
    pool.close().await;
}
