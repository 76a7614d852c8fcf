/// Configuration management for the API server
///
/// Configuration comes from environment variables (a `.env` file is loaded
/// first when present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `INSTA_APP_ID`, `INSTA_APP_SECRET`, `INSTA_REDIRECT_URL`: Identity provider app
/// - `STORAGE_BACKEND`: `local` or `bucket` (default: local)
/// - `STORAGE_LOCAL_PATH`, `STORAGE_PUBLIC_URL`: Local storage directory and its URL
/// - `STORAGE_BUCKET_HOST`: Bucket host (required for `bucket`)
/// - `FFMPEG_PATH`, `FFPROBE_PATH`: Audio tools (default: looked up on PATH)
/// - `MEDIA_TIMEOUT_SECS`: Bound on each external call (default: 30)
/// - `VOICE_WORK_DIR`: Temp directory for uploads (default: system temp dir)
/// - `SHARE_BASE_URL`: Base of share links
/// - `QUESTION_MAX_LEN`, `VOTE_QUESTION_MAX_LEN`, `VOTE_OPTION_MAX_LEN`,
///   `COMMENT_MAX_LEN`: Content limits in characters, at most the width of
///   the column holding the content (500, 500, 100, 1024)
/// - `QUESTION_EXPIRY_HOURS`: Question time window (default: 24)
///
/// # Example
///
/// ```no_run
/// use tikitaka_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tikitaka_shared::limits::{
    Limits, COMMENT_CONTENT_COLUMN, QUESTION_CONTENT_COLUMN, VOTE_OPTION_CONTENT_COLUMN,
};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Identity provider app
    pub insta: InstaConfig,

    /// Where voice recordings are stored
    pub storage: StorageConfig,

    /// Audio processing
    pub media: MediaConfig,

    /// Base URL of share links
    pub share_base_url: String,

    /// Content limits and expiry window
    pub limits: Limits,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` = any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Identity provider app registration
#[derive(Debug, Clone)]
pub struct InstaConfig {
    pub app_id: String,
    pub app_secret: String,
    pub redirect_url: String,
}

/// Object storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files on local disk, served by this server under `/files`
    Local {
        /// Directory holding the files
        path: PathBuf,
        /// URL prefix the files are reachable at
        public_url: String,
    },

    /// Public bucket written with HTTP PUT
    Bucket {
        /// Bucket host
        host: String,
    },
}

/// Audio processing configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,

    /// Timeout for each external call (tool run, upload, provider request)
    pub timeout_secs: u64,

    /// Where uploads are staged while processing
    pub work_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database_url =
            get("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let storage = match var("STORAGE_BACKEND", "local").as_str() {
            "local" => StorageConfig::Local {
                path: PathBuf::from(var("STORAGE_LOCAL_PATH", "./data/voices")),
                public_url: var("STORAGE_PUBLIC_URL", "http://localhost:8080/files"),
            },
            "bucket" => StorageConfig::Bucket {
                host: get("STORAGE_BUCKET_HOST")
                    .context("STORAGE_BUCKET_HOST is required when STORAGE_BACKEND=bucket")?,
            },
            other => anyhow::bail!("STORAGE_BACKEND must be `local` or `bucket`, got `{}`", other),
        };

        let work_dir = get("VOICE_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("tikitaka-voice"));

        let defaults = Limits::default();
        let expiry_hours: i64 = parse(&get, "QUESTION_EXPIRY_HOURS", defaults.expiry_window.num_hours())?;
        if expiry_hours <= 0 {
            anyhow::bail!("QUESTION_EXPIRY_HOURS must be positive");
        }
        let limits = Limits {
            question_content: content_limit(
                &get,
                "QUESTION_MAX_LEN",
                defaults.question_content,
                QUESTION_CONTENT_COLUMN,
            )?,
            vote_question_content: content_limit(
                &get,
                "VOTE_QUESTION_MAX_LEN",
                defaults.vote_question_content,
                QUESTION_CONTENT_COLUMN,
            )?,
            vote_option_content: content_limit(
                &get,
                "VOTE_OPTION_MAX_LEN",
                defaults.vote_option_content,
                VOTE_OPTION_CONTENT_COLUMN,
            )?,
            comment_content: content_limit(
                &get,
                "COMMENT_MAX_LEN",
                defaults.comment_content,
                COMMENT_CONTENT_COLUMN,
            )?,
            expiry_window: chrono::Duration::hours(expiry_hours),
            ..defaults
        };

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse(&get, "API_PORT", 8080)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            insta: InstaConfig {
                app_id: var("INSTA_APP_ID", ""),
                app_secret: var("INSTA_APP_SECRET", ""),
                redirect_url: var(
                    "INSTA_REDIRECT_URL",
                    "https://localhost:8080/api/v1/insta/redirection",
                ),
            },
            storage,
            media: MediaConfig {
                ffmpeg_path: PathBuf::from(var("FFMPEG_PATH", "ffmpeg")),
                ffprobe_path: PathBuf::from(var("FFPROBE_PATH", "ffprobe")),
                timeout_secs: parse(&get, "MEDIA_TIMEOUT_SECS", 30)?,
                work_dir,
            },
            share_base_url: var("SHARE_BASE_URL", "https://tikitaka.app"),
            limits,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Parses a content limit, which must fit the column that stores the content
fn content_limit<F>(get: &F, key: &str, default: usize, column: usize) -> anyhow::Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let limit = parse(get, key, default)?;
    if limit == 0 || limit > column {
        anyhow::bail!("{} must be between 1 and {}, got {}", key, column, limit);
    }
    Ok(limit)
}
