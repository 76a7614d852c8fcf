/// Instagram identity provider
///
/// Talks to the Instagram basic display endpoints with `reqwest`. All calls
/// share one client built with a request timeout.
///
/// # Example
///
/// ```no_run
/// use tikitaka_shared::identity::{IdentityProvider, InstagramConfig, InstagramProvider};
///
/// # async fn example(code: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let config = InstagramConfig::new("app-id", "app-secret", "https://localhost:8000/api/v1/insta/redirection");
/// let provider = InstagramProvider::new(config)?;
///
/// let short = provider.exchange_code(code).await?;
/// let long = provider.exchange_long_lived(&short.access_token).await?;
/// let profile = provider.fetch_profile(&long.access_token).await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AccessToken, IdentityProvider};
use crate::error::{StoreError, StoreResult};
use crate::models::user::{CreateUser, ProfileAttributes};

const DEFAULT_AUTHORIZE_URL: &str = "https://api.instagram.com/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://api.instagram.com/oauth/access_token";
const DEFAULT_GRAPH_URL: &str = "https://graph.instagram.com";
const DEFAULT_PROFILE_INFO_URL: &str = "https://i.instagram.com/api/v1/users/web_profile_info/";

// web_profile_info only answers requests that look like the mobile app
const PROFILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 12_3_1 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 Instagram 105.0.0.11.118 \
    (iPhone11,8; iOS 12_3_1; en_US; en-US; scale=2.00; 828x1792; 165586599)";

/// Configuration for the Instagram provider
#[derive(Debug, Clone)]
pub struct InstagramConfig {
    /// OAuth client ID
    pub app_id: String,

    /// OAuth client secret
    pub app_secret: String,

    /// Redirect URI registered with the app
    pub redirect_url: String,

    /// Authorization page
    pub authorize_url: String,

    /// Code-for-token exchange endpoint
    pub token_url: String,

    /// Graph API base (long-lived tokens, refresh, `me`)
    pub graph_url: String,

    /// Public profile lookup by username
    pub profile_info_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl InstagramConfig {
    /// Creates a configuration pointing at the public Instagram endpoints
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            redirect_url: redirect_url.into(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            profile_info_url: DEFAULT_PROFILE_INFO_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn graph(&self, path: &str, params: &[(&str, &str)]) -> StoreResult<Url> {
        let base = format!("{}/{}", self.graph_url.trim_end_matches('/'), path);
        parse_url(&base, params)
    }
}

/// Instagram-backed `IdentityProvider`
#[derive(Debug, Clone)]
pub struct InstagramProvider {
    config: InstagramConfig,
    client: Client,
}

impl InstagramProvider {
    /// Builds the provider and its HTTP client
    pub fn new(config: InstagramConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::IdentityProvider(format!("failed to build http client: {}", e)))?;

        Ok(Self { config, client })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> StoreResult<T> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        read_reply(response).await
    }
}

#[async_trait]
impl IdentityProvider for InstagramProvider {
    fn authorize_url(&self) -> String {
        let params = [
            ("client_id", self.config.app_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("scope", "user_profile,user_media"),
            ("response_type", "code"),
        ];

        match parse_url(&self.config.authorize_url, &params) {
            Ok(url) => url.to_string(),
            // unparseable base: hand it back as configured
            Err(_) => self.config.authorize_url.clone(),
        }
    }

    async fn exchange_code(&self, code: &str) -> StoreResult<AccessToken> {
        let form = [
            ("client_id", self.config.app_id.as_str()),
            ("client_secret", self.config.app_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let token: AccessToken = read_reply(response).await?;
        debug!("Exchanged authorization code for short-lived token");
        Ok(token)
    }

    async fn exchange_long_lived(&self, short_token: &str) -> StoreResult<AccessToken> {
        let url = self.config.graph(
            "access_token",
            &[
                ("grant_type", "ig_exchange_token"),
                ("client_secret", self.config.app_secret.as_str()),
                ("access_token", short_token),
            ],
        )?;

        self.get(url).await
    }

    async fn refresh(&self, long_token: &str) -> StoreResult<AccessToken> {
        let url = self.config.graph(
            "refresh_access_token",
            &[("grant_type", "ig_refresh_token"), ("access_token", long_token)],
        )?;

        self.get(url).await
    }

    async fn fetch_profile(&self, access_token: &str) -> StoreResult<CreateUser> {
        let url = self
            .config
            .graph("me", &[("fields", "id,username"), ("access_token", access_token)])?;
        let me: MeReply = self.get(url).await?;

        let url = parse_url(&self.config.profile_info_url, &[("username", me.username.as_str())])?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, PROFILE_USER_AGENT)
            .send()
            .await
            .map_err(transport_error)?;
        let info: ProfileInfoReply = read_reply(response).await?;

        debug!(username = %me.username, "Fetched provider profile");
        Ok(info.into_create_user(me.username))
    }
}

#[derive(Debug, Deserialize)]
struct MeReply {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ProfileInfoReply {
    data: ProfileInfoData,
}

#[derive(Debug, Deserialize)]
struct ProfileInfoData {
    user: ProfileInfoUser,
}

#[derive(Debug, Deserialize)]
struct ProfileInfoUser {
    id: String,
    #[serde(default)]
    full_name: Option<String>,
    edge_followed_by: EdgeCount,
    edge_follow: EdgeCount,
    #[serde(default)]
    profile_pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EdgeCount {
    count: i64,
}

impl ProfileInfoReply {
    fn into_create_user(self, username: String) -> CreateUser {
        let user = self.data.user;
        CreateUser {
            external_id: user.id,
            profile: ProfileAttributes {
                username: Some(username),
                full_name: user.full_name,
                follower_count: clamp_count(user.edge_followed_by.count),
                following_count: clamp_count(user.edge_follow.count),
                profile_image_url: user.profile_pic_url,
            },
        }
    }
}

/// Error payloads returned by the OAuth and Graph endpoints
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderErrorReply {
    OAuth { error_type: String, error_message: String },
    Graph { error: GraphError },
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

impl ProviderErrorReply {
    fn into_message(self) -> String {
        match self {
            ProviderErrorReply::OAuth {
                error_type,
                error_message,
            } => format!("{}: {}", error_type, error_message),
            ProviderErrorReply::Graph { error } => error.message,
        }
    }
}

fn clamp_count(count: i64) -> i32 {
    i32::try_from(count.max(0)).unwrap_or(i32::MAX)
}

fn parse_url(base: &str, params: &[(&str, &str)]) -> StoreResult<Url> {
    Url::parse_with_params(base, params)
        .map_err(|e| StoreError::IdentityProvider(format!("invalid provider url {}: {}", base, e)))
}

fn transport_error(err: reqwest::Error) -> StoreError {
    warn!(error = %err, "Identity provider request failed");
    StoreError::IdentityProvider(err.to_string())
}

async fn read_reply<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    parse_reply(status.is_success(), &body)
}

/// Turns a provider reply body into `T`, surfacing provider error payloads
fn parse_reply<T: DeserializeOwned>(success: bool, body: &str) -> StoreResult<T> {
    if let Ok(error) = serde_json::from_str::<ProviderErrorReply>(body) {
        let message = error.into_message();
        warn!(error = %message, "Identity provider rejected request");
        return Err(StoreError::IdentityProvider(message));
    }

    if !success {
        warn!("Identity provider returned an error status");
        return Err(StoreError::IdentityProvider(
            "provider returned an error status".to_string(),
        ));
    }

    serde_json::from_str(body)
        .map_err(|e| StoreError::IdentityProvider(format!("malformed provider reply: {}", e)))
}
