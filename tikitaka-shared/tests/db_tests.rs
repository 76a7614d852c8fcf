/// Integration tests for the connection pool and migrations
///
/// Run with: cargo test --test db_tests -- --ignored

mod common;

use tikitaka_shared::db::migrations::{known_versions, migration_status, run_migrations};
use tikitaka_shared::db::pool::{close_pool, create_pool, health_check, pool_stats, PoolConfig};
use std::time::Duration;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_pool_health_and_stats() {
    let pool = common::setup_pool().await;

    health_check(&pool).await.expect("Health check failed");

    let stats = pool_stats(&pool);
    assert!(stats.total >= 1);
    assert_eq!(stats.active + stats.idle, stats.total);

    close_pool(pool).await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_migrations_are_idempotent() {
    let pool = common::setup_pool().await;

    run_migrations(&pool).await.expect("Second migration run failed");

    let status = migration_status(&pool).await.expect("Failed to read status");
    assert!(status.is_up_to_date);
    assert!(status.applied >= known_versions().len());
    assert_eq!(status.latest_version, known_versions().last().copied());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_vote_question_with_policy_is_rejected_by_schema() {
    let pool = common::setup_pool().await;
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "schema").await;

    let result = sqlx::query(
        "INSERT INTO questions (user_id, content, kind, comment_policy) VALUES ($1, 'x', 'vote', 'text')",
    )
    .bind(user.id)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Vote question with a comment policy was accepted");
}

#[tokio::test]
async fn test_create_pool_with_bad_url_fails() {
    let config = PoolConfig {
        acquire_timeout: Duration::from_secs(1),
        ..PoolConfig::new("postgresql://nobody@127.0.0.1:1/nothing")
    };

    assert!(create_pool(config).await.is_err());
}
