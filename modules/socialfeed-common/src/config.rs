use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Facebook Graph API credentials for a single page.
#[derive(Debug, Clone, Default)]
pub struct FacebookCredentials {
    pub access_token: String,
    pub app_id: String,
    pub app_secret: String,
    pub page_id: String,
}

/// Instagram Graph API credentials (business/creator account).
#[derive(Debug, Clone, Default)]
pub struct InstagramCredentials {
    pub user_id: String,
    pub access_token: String,
}

/// LinkedIn client-credentials app plus the organization whose posts are read.
#[derive(Debug, Clone, Default)]
pub struct LinkedinCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub organization_id: String,
}

/// Twitter API v2 credentials plus the recent-search query.
#[derive(Debug, Clone, Default)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub bearer_token: String,
    pub search_query: String,
}

/// Application configuration loaded from environment variables.
/// Missing platform credentials are not an error here; the matching
/// provider simply reports itself as unconfigured.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,

    pub media_dir: PathBuf,
    pub posts_folder: String,
    pub assets_folder: String,
    pub post_limit: u32,

    pub http_timeout: Duration,
    pub tls_verify: bool,

    pub facebook: FacebookCredentials,
    pub instagram: InstagramCredentials,
    pub linkedin: LinkedinCredentials,
    pub twitter: TwitterCredentials,
}

pub const DEFAULT_POSTS_FOLDER: &str = "/SocialMediaPosts";
pub const DEFAULT_ASSETS_FOLDER: &str = "/SocialMedia";
pub const DEFAULT_POST_LIMIT: u32 = 25;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            media_dir: PathBuf::from("./var/social-media"),
            posts_folder: DEFAULT_POSTS_FOLDER.to_string(),
            assets_folder: DEFAULT_ASSETS_FOLDER.to_string(),
            post_limit: DEFAULT_POST_LIMIT,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            tls_verify: true,
            facebook: FacebookCredentials::default(),
            instagram: InstagramCredentials::default(),
            linkedin: LinkedinCredentials::default(),
            twitter: TwitterCredentials::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            media_dir: env::var("SOCIALFEED_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            posts_folder: env::var("SOCIALFEED_POSTS_FOLDER").unwrap_or(defaults.posts_folder),
            assets_folder: env::var("SOCIALFEED_ASSETS_FOLDER").unwrap_or(defaults.assets_folder),
            post_limit: parse_env("SOCIALFEED_POST_LIMIT", DEFAULT_POST_LIMIT)?,
            http_timeout: Duration::from_secs(parse_env(
                "SOCIALFEED_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            tls_verify: parse_env("SOCIALFEED_TLS_VERIFY", true)?,
            facebook: FacebookCredentials {
                access_token: optional_env("FACEBOOK_ACCESS_TOKEN"),
                app_id: optional_env("FACEBOOK_APP_ID"),
                app_secret: optional_env("FACEBOOK_APP_SECRET"),
                page_id: optional_env("FACEBOOK_PAGE_ID"),
            },
            instagram: InstagramCredentials {
                user_id: optional_env("INSTAGRAM_USER_ID"),
                access_token: optional_env("INSTAGRAM_ACCESS_TOKEN"),
            },
            linkedin: LinkedinCredentials {
                client_id: optional_env("LINKEDIN_CLIENT_ID"),
                client_secret: optional_env("LINKEDIN_CLIENT_SECRET"),
                organization_id: optional_env("LINKEDIN_ORGANIZATION_ID"),
            },
            twitter: TwitterCredentials {
                api_key: optional_env("TWITTER_API_KEY"),
                api_secret: optional_env("TWITTER_API_SECRET"),
                bearer_token: optional_env("TWITTER_BEARER_TOKEN"),
                search_query: optional_env("TWITTER_SEARCH_QUERY"),
            },
        };

        config.log_keys();
        Ok(config)
    }

    /// Log which secrets are present without revealing them.
    pub fn log_keys(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "(unset)".to_string();
            }
            let head: String = val.chars().take(4).collect();
            format!("{head}...")
        }

        tracing::info!(
            database = self.database_url.is_some(),
            media_dir = %self.media_dir.display(),
            post_limit = self.post_limit,
            tls_verify = self.tls_verify,
            "Loaded configuration"
        );
        tracing::debug!(
            facebook_token = %preview(&self.facebook.access_token),
            instagram_token = %preview(&self.instagram.access_token),
            linkedin_client = %preview(&self.linkedin.client_id),
            twitter_bearer = %preview(&self.twitter.bearer_token),
            "Platform credentials"
        );
    }
}

fn optional_env(key: &str) -> String {
    env::var(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}
