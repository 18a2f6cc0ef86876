use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use socialfeed_common::{Config, MediaItem, Platform, Post};

use crate::error::Result;
use crate::http::build_client;
use crate::media::MediaDownloader;
use crate::providers::{FacebookProvider, InstagramProvider, LinkedinProvider, TwitterProvider};

/// Page size ceiling shared by all four platform APIs.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One social platform integration.
///
/// Callers check `is_configured()` before `fetch_posts()`; an unconfigured
/// provider is skipped, never asked to fetch.
#[async_trait]
pub trait Provider: Send + Sync {
    fn platform(&self) -> Platform;

    /// True when every credential/identifier needed for network calls is non-empty.
    fn is_configured(&self) -> bool;

    /// One authenticated read of the platform feed, capped at
    /// `min(limit, MAX_PAGE_SIZE)` items, mapped to posts.
    async fn fetch_posts(&self, limit: u32) -> Result<Vec<Post>>;

    /// Download the attachments of `post` into `target_dir`. Returns the
    /// post's media in attachment order; items that failed to download keep
    /// `local_path == None`.
    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem>;
}

/// Exactly one provider per platform, iterated in platform order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<Platform, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all four providers from configuration, sharing one HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = build_client(config.http_timeout, config.tls_verify)?;
        let downloader = MediaDownloader::new(client.clone());

        let mut registry = Self::new();
        registry.register(Arc::new(TwitterProvider::new(
            config.twitter.clone(),
            client.clone(),
            downloader.clone(),
        )));
        registry.register(Arc::new(InstagramProvider::new(
            config.instagram.clone(),
            client.clone(),
            downloader.clone(),
        )));
        registry.register(Arc::new(FacebookProvider::new(
            config.facebook.clone(),
            client.clone(),
            downloader.clone(),
        )));
        registry.register(Arc::new(LinkedinProvider::new(
            config.linkedin.clone(),
            client,
            downloader,
        )));

        Ok(registry)
    }

    /// Register a provider, replacing any previous provider for its platform.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        let platform = provider.platform();
        if self.providers.insert(platform, provider).is_some() {
            tracing::debug!(%platform, "Replaced registered provider");
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &Arc<dyn Provider>)> {
        self.providers.iter().map(|(p, provider)| (*p, provider))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_platforms_from_config() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        let mut expected = Platform::ALL.to_vec();
        expected.sort();
        assert_eq!(registry.platforms(), expected);
        for (platform, provider) in registry.iter() {
            assert_eq!(provider.platform(), platform);
            assert!(!provider.is_configured(), "{platform} has no credentials in default config");
        }
    }

    #[test]
    fn register_replaces_same_platform() {
        let config = Config::default();
        let client = reqwest::Client::new();
        let downloader = MediaDownloader::new(client.clone());

        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(TwitterProvider::new(
            config.twitter.clone(),
            client.clone(),
            downloader.clone(),
        )));
        registry.register(Arc::new(TwitterProvider::new(config.twitter, client, downloader)));
        assert_eq!(registry.len(), 1);
    }
}
