/// User model and database operations
///
/// Users are created the first time an external identity provider account is
/// linked and refreshed on every later linkage. Users are never hard-deleted:
/// `is_deleted` marks a user as logically removed while the row (and its
/// unique `external_id`) stays in place.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id VARCHAR(64) NOT NULL UNIQUE,
///     username VARCHAR(64),
///     full_name VARCHAR(255),
///     follower_count INTEGER NOT NULL DEFAULT 0,
///     following_count INTEGER NOT NULL DEFAULT 0,
///     profile_image_url VARCHAR(1024),
///     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tikitaka_shared::models::user::{CreateUser, ProfileAttributes, User};
/// use tikitaka_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     external_id: "17841400000000000".to_string(),
///     profile: ProfileAttributes {
///         username: Some("jane".to_string()),
///         ..Default::default()
///     },
/// }).await?;
///
/// let found = User::find_by_id(&pool, user.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// User linked to an external identity provider account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Account identifier at the identity provider
    ///
    /// Unique across all users, including soft-deleted ones
    pub external_id: String,

    /// Provider username
    pub username: Option<String>,

    /// Display name
    pub full_name: Option<String>,

    /// Follower count at last profile refresh
    pub follower_count: i32,

    /// Following count at last profile refresh
    pub following_count: i32,

    /// Avatar URL
    pub profile_image_url: Option<String>,

    /// Soft-delete flag
    pub is_deleted: bool,

    /// When the user was first linked
    pub created_at: DateTime<Utc>,

    /// When the profile was last refreshed
    pub updated_at: DateTime<Utc>,
}

/// Profile attributes refreshed from the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAttributes {
    /// Provider username
    pub username: Option<String>,

    /// Display name
    pub full_name: Option<String>,

    /// Follower count
    #[serde(default)]
    pub follower_count: i32,

    /// Following count
    #[serde(default)]
    pub following_count: i32,

    /// Avatar URL
    pub profile_image_url: Option<String>,
}

/// Input for creating (or refreshing) a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Account identifier at the identity provider
    pub external_id: String,

    /// Profile attributes
    #[serde(flatten)]
    pub profile: ProfileAttributes,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a database error if `external_id` already exists (unique
    /// constraint violation) or the connection fails.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, username, full_name, follower_count,
                               following_count, profile_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, external_id, username, full_name, follower_count, following_count,
                      profile_image_url, is_deleted, created_at, updated_at
            "#,
        )
        .bind(data.external_id)
        .bind(data.profile.username)
        .bind(data.profile.full_name)
        .bind(data.profile.follower_count)
        .bind(data.profile.following_count)
        .bind(data.profile.profile_image_url)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID, deleted or not
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, username, full_name, follower_count, following_count,
                   profile_image_url, is_deleted, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID and takes a row lock for the rest of the transaction
    pub async fn lock_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, username, full_name, follower_count, following_count,
                   profile_image_url, is_deleted, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Refreshes the profile of the active user with this identifier
    ///
    /// Returns None if no active user has the identifier; soft-deleted users
    /// are not touched.
    pub async fn update_active_profile<'e, E: PgExecutor<'e>>(
        executor: E,
        external_id: &str,
        profile: ProfileAttributes,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2,
                full_name = $3,
                follower_count = $4,
                following_count = $5,
                profile_image_url = $6,
                updated_at = NOW()
            WHERE external_id = $1 AND is_deleted = FALSE
            RETURNING id, external_id, username, full_name, follower_count, following_count,
                      profile_image_url, is_deleted, created_at, updated_at
            "#,
        )
        .bind(external_id)
        .bind(profile.username)
        .bind(profile.full_name)
        .bind(profile.follower_count)
        .bind(profile.following_count)
        .bind(profile.profile_image_url)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Clears the soft-delete flag of a deleted user and refreshes its profile
    ///
    /// Returns None if there is no soft-deleted user with the identifier.
    pub async fn revive<'e, E: PgExecutor<'e>>(
        executor: E,
        external_id: &str,
        profile: ProfileAttributes,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_deleted = FALSE,
                username = $2,
                full_name = $3,
                follower_count = $4,
                following_count = $5,
                profile_image_url = $6,
                updated_at = NOW()
            WHERE external_id = $1 AND is_deleted = TRUE
            RETURNING id, external_id, username, full_name, follower_count, following_count,
                      profile_image_url, is_deleted, created_at, updated_at
            "#,
        )
        .bind(external_id)
        .bind(profile.username)
        .bind(profile.full_name)
        .bind(profile.follower_count)
        .bind(profile.following_count)
        .bind(profile.profile_image_url)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Sets the soft-delete flag
    ///
    /// Returns false if the user was missing or already deleted.
    pub async fn mark_deleted<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_flattens_profile() {
        let json = serde_json::json!({
            "external_id": "1784",
            "username": "jane",
            "follower_count": 12
        });

        let data: CreateUser = serde_json::from_value(json).unwrap();
        assert_eq!(data.external_id, "1784");
        assert_eq!(data.profile.username.as_deref(), Some("jane"));
        assert_eq!(data.profile.follower_count, 12);
        assert_eq!(data.profile.following_count, 0);
        assert!(data.profile.full_name.is_none());
    }

    #[test]
    fn test_profile_attributes_default() {
        let profile = ProfileAttributes::default();
        assert!(profile.username.is_none());
        assert!(profile.profile_image_url.is_none());
        assert_eq!(profile.follower_count, 0);
    }

    // Integration tests for database operations are in tests/store_tests.rs
}
