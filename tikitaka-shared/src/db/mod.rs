/// Database plumbing
///
/// - `pool`: connection pool with health checks
/// - `clock`: the database server's time, used for expiry cutoffs
/// - `migrations`: embedded schema migrations
///
/// Row types and their queries are in `models`.

pub mod clock;
pub mod migrations;
pub mod pool;
