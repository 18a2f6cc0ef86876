use socialfeed_common::Platform;
use socialfeed_providers::FetchError;
use thiserror::Error;

/// Failure inside a persistence, asset or tag store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

/// Why a provider's import was skipped or cut short.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0} provider is not configured")]
    NotConfigured(Platform),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
