/// Identity store
///
/// Active-user semantics on top of the `users` table: lookups distinguish
/// "never existed" (`NotFound`) from "soft-deleted" (`Gone`), and deleting a
/// user soft-deletes all of their questions in the same transaction.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::question::Question;
use crate::models::user::{CreateUser, ProfileAttributes, User};

/// Identity store
#[derive(Debug, Clone)]
pub struct UserStore {
    db: PgPool,
}

impl UserStore {
    /// Creates a new identity store
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates a user
    ///
    /// # Errors
    ///
    /// `Conflict` if a user (active or soft-deleted) already has this identifier.
    pub async fn create(&self, data: CreateUser) -> StoreResult<User> {
        let external_id = data.external_id.clone();

        let user = User::create(&self.db, data).await.map_err(|e| {
            StoreError::from_unique_violation(e, format!("user {} already exists", external_id))
        })?;

        info!(user_id = %user.id, external_id = %user.external_id, "User created");
        Ok(user)
    }

    /// Refreshes the profile of the active user with this identifier
    ///
    /// # Errors
    ///
    /// `NotFound` if no active user has the identifier, including when the
    /// only match is soft-deleted.
    pub async fn update(&self, external_id: &str, profile: ProfileAttributes) -> StoreResult<User> {
        let user = User::update_active_profile(&self.db, external_id, profile)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        debug!(user_id = %user.id, "User profile refreshed");
        Ok(user)
    }

    /// Update-or-create used by identity linkage
    ///
    /// Refreshes the active user with this identifier; if there is none, a
    /// soft-deleted user with the identifier is revived, otherwise a new user
    /// is created.
    pub async fn link_profile(&self, data: CreateUser) -> StoreResult<User> {
        match self.update(&data.external_id, data.profile.clone()).await {
            Err(StoreError::NotFound(_)) => {}
            other => return other,
        }

        if let Some(user) = User::revive(&self.db, &data.external_id, data.profile.clone()).await? {
            info!(user_id = %user.id, "Soft-deleted user revived on relink");
            return Ok(user);
        }

        let external_id = data.external_id.clone();
        let profile = data.profile.clone();
        match self.create(data).await {
            // lost a race with a concurrent link of the same account
            Err(StoreError::Conflict(_)) => self.update(&external_id, profile).await,
            other => other,
        }
    }

    /// Gets an active user
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `Gone` if soft-deleted.
    pub async fn get(&self, id: Uuid) -> StoreResult<User> {
        let user = User::find_by_id(&self.db, id)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        if user.is_deleted {
            return Err(StoreError::Gone("user"));
        }

        Ok(user)
    }

    /// Soft-deletes a user and every non-deleted question they own
    ///
    /// Both updates commit together or not at all. Returns the number of
    /// questions soft-deleted by the cascade.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `AlreadyDeleted` if already soft-deleted.
    pub async fn delete(&self, id: Uuid) -> StoreResult<u64> {
        let mut tx = self.db.begin().await?;

        let user = User::lock_by_id(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        if user.is_deleted {
            return Err(StoreError::AlreadyDeleted("user"));
        }

        User::mark_deleted(&mut *tx, id).await?;
        let cascaded = Question::mark_deleted_for_user(&mut *tx, id).await?;

        tx.commit().await?;

        info!(user_id = %id, cascaded_questions = cascaded, "User soft-deleted");
        Ok(cascaded)
    }
}
