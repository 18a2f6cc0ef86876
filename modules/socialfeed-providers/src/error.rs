use socialfeed_common::Platform;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a provider could not produce its feed for this run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{platform} network error: {message}")]
    Network { platform: Platform, message: String },

    #[error("{platform} API error (status {status}): {body}")]
    Api {
        platform: Platform,
        status: u16,
        body: String,
    },

    #[error("{platform} returned an empty response body")]
    EmptyBody { platform: Platform },

    #[error("{platform} response could not be parsed: {message}")]
    Malformed { platform: Platform, message: String },

    #[error("{platform} authentication failed: {message}")]
    Auth { platform: Platform, message: String },
}

impl FetchError {
    pub fn platform(&self) -> Platform {
        match self {
            FetchError::Network { platform, .. }
            | FetchError::Api { platform, .. }
            | FetchError::EmptyBody { platform }
            | FetchError::Malformed { platform, .. }
            | FetchError::Auth { platform, .. } => *platform,
        }
    }

    pub(crate) fn network(platform: Platform, err: reqwest::Error) -> Self {
        FetchError::Network {
            platform,
            message: err.to_string(),
        }
    }

    pub(crate) fn auth(platform: Platform, message: impl Into<String>) -> Self {
        FetchError::Auth {
            platform,
            message: message.into(),
        }
    }
}

/// Failure to fetch one media file. Logged by the caller, never propagated.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
