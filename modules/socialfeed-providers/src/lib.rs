pub mod error;
pub mod http;
pub mod media;
pub mod provider;
pub mod providers;

#[cfg(test)]
mod test_server;

pub use error::{DownloadError, FetchError, Result};
pub use http::build_client;
pub use media::{media_filename, MediaDownloader};
pub use provider::{Provider, ProviderRegistry, MAX_PAGE_SIZE};
pub use providers::{FacebookProvider, InstagramProvider, LinkedinProvider, TwitterProvider};
