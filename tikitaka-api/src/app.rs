/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tikitaka_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = tikitaka_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::{Config, StorageConfig};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tikitaka_shared::{
    identity::{IdentityProvider, InstagramConfig, InstagramProvider},
    media::{AudioTransform, BucketStorage, FfmpegPitchShift, LocalStorage, StorageBackend, VoicePipeline},
    store::Stores,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted voice upload
pub const MAX_VOICE_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Rule layer over the database
    pub stores: Stores,

    /// Identity provider used to link users
    pub identity: Arc<dyn IdentityProvider>,

    /// Background voice comment processing
    pub voice: VoicePipeline,
}

impl AppState {
    /// Creates application state with the collaborators named in `config`
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client for the identity provider or the bucket
    /// cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.media.timeout_secs);

        let identity = InstagramProvider::new(
            InstagramConfig::new(
                config.insta.app_id.clone(),
                config.insta.app_secret.clone(),
                config.insta.redirect_url.clone(),
            )
            .with_timeout(timeout),
        )?;

        let storage: Arc<dyn StorageBackend> = match &config.storage {
            StorageConfig::Local { path, public_url } => {
                Arc::new(LocalStorage::new(path.clone(), public_url.clone()))
            }
            StorageConfig::Bucket { host } => Arc::new(BucketStorage::new(host.clone(), timeout)?),
        };

        let transform = FfmpegPitchShift::new(
            config.media.ffmpeg_path.clone(),
            config.media.ffprobe_path.clone(),
            timeout,
        );

        Ok(Self::with_collaborators(
            db,
            config,
            Arc::new(identity),
            storage,
            Arc::new(transform),
        ))
    }

    /// Creates application state around the given collaborators
    pub fn with_collaborators(
        db: PgPool,
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn StorageBackend>,
        transform: Arc<dyn AudioTransform>,
    ) -> Self {
        let stores = Stores::new(db.clone(), config.limits);
        let voice = VoicePipeline::new(
            stores.comments.clone(),
            storage,
            transform,
            config.media.work_dir.clone(),
        );

        Self {
            db,
            config: Arc::new(config),
            stores,
            identity,
            voice,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check
/// ├── /files/:key                      # Stored recordings (local storage only)
/// └── /api/v1/
///     ├── GET  /authorize              # Redirect to the identity provider
///     ├── GET  /insta/redirection      # Authorization code callback
///     ├── GET  /refresh-token          # Refresh a long-lived token
///     ├── /users
///     │   ├── POST   /                 # Create
///     │   ├── PUT    /                 # Update, create on miss
///     │   ├── POST   /by_access_token
///     │   ├── GET    /:id
///     │   ├── DELETE /:id
///     │   └── GET    /:id/share/:question_id
///     ├── /questions
///     │   ├── POST   /
///     │   ├── POST   /vote
///     │   ├── GET    /random
///     │   ├── GET    /history/:user_id
///     │   ├── GET    /users/:user_id
///     │   ├── GET    /:id
///     │   ├── GET    /:id/live
///     │   ├── GET    /:id/options
///     │   └── DELETE /:id
///     └── /comments
///         ├── POST   /text
///         ├── POST   /voice
///         ├── GET    /questions/:question_id
///         ├── PUT    /vote/:option_id
///         ├── GET    /vote/:question_id
///         ├── GET    /users/:user_id/{text,audio,vote}
///         ├── GET    /:id
///         └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. Response compression (gzip, brotli)
/// 3. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/authorize", get(routes::auth::authorize))
        .route("/insta/redirection", get(routes::auth::redirection))
        .route("/refresh-token", get(routes::auth::refresh_token));

    let user_routes = Router::new()
        .route(
            "/",
            post(routes::users::create_user).put(routes::users::upsert_user),
        )
        .route("/by_access_token", post(routes::users::link_by_access_token))
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route("/:id/share/:question_id", get(routes::users::share_link));

    let question_routes = Router::new()
        .route("/", post(routes::questions::create_question))
        .route("/vote", post(routes::questions::create_vote_question))
        .route("/random", get(routes::questions::random_question))
        .route("/history/:user_id", get(routes::questions::question_history))
        .route("/users/:user_id", get(routes::questions::user_questions))
        .route(
            "/:id",
            get(routes::questions::get_question).delete(routes::questions::delete_question),
        )
        .route("/:id/live", get(routes::questions::get_live_question))
        .route("/:id/options", get(routes::questions::question_options));

    // Both vote routes share one path; the id is an option for PUT and a
    // question for GET.
    let comment_routes = Router::new()
        .route("/text", post(routes::comments::create_text_comment))
        .route(
            "/voice",
            post(routes::comments::create_voice_comment)
                .layer(DefaultBodyLimit::max(MAX_VOICE_UPLOAD_BYTES)),
        )
        .route(
            "/questions/:question_id",
            get(routes::comments::question_comments),
        )
        .route(
            "/vote/:id",
            put(routes::comments::cast_vote).get(routes::comments::vote_result),
        )
        .route("/users/:user_id/text", get(routes::comments::user_text_comments))
        .route("/users/:user_id/audio", get(routes::comments::user_audio_comments))
        .route("/users/:user_id/vote", get(routes::comments::user_vote_results))
        .route(
            "/:id",
            get(routes::comments::get_comment).delete(routes::comments::delete_comment),
        );

    let v1_routes = Router::new()
        .merge(auth_routes)
        .nest("/users", user_routes)
        .nest("/questions", question_routes)
        .nest("/comments", comment_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(routes::auth::LONG_ACCESS_TOKEN_HEADER),
            ])
            .max_age(Duration::from_secs(3600))
    };

    let mut router = Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes);

    if let StorageConfig::Local { path, .. } = &state.config.storage {
        router = router.nest_service("/files", ServeDir::new(path));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
