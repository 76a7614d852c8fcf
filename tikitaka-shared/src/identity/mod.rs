/// Identity provider boundary
///
/// Users are linked to an external social account. The provider hands out an
/// authorization code, which is exchanged for a short-lived token and then a
/// long-lived token; the long-lived token is used to read the account profile
/// and can be refreshed before it lapses.
///
/// Every failure (provider error payload, transport error, malformed reply)
/// surfaces as `StoreError::IdentityProvider`.

pub mod instagram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::models::user::CreateUser;

pub use instagram::{InstagramConfig, InstagramProvider};

/// Access token issued by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token
    pub access_token: String,

    /// Token type, if the provider reports one
    #[serde(default)]
    pub token_type: Option<String>,

    /// Seconds until expiry, if the provider reports it
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the user is sent to in order to grant access
    fn authorize_url(&self) -> String;

    /// Exchanges an authorization code for a short-lived token
    async fn exchange_code(&self, code: &str) -> StoreResult<AccessToken>;

    /// Exchanges a short-lived token for a long-lived one
    async fn exchange_long_lived(&self, short_token: &str) -> StoreResult<AccessToken>;

    /// Refreshes a long-lived token
    async fn refresh(&self, long_token: &str) -> StoreResult<AccessToken>;

    /// Reads the account profile behind a token
    async fn fetch_profile(&self, access_token: &str) -> StoreResult<CreateUser>;
}
