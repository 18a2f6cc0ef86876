//! Import orchestration.
//!
//! Providers are drained one after another: fetch, then for each post
//! download media, register assets, upsert and tag. A provider that is
//! unconfigured or fails to fetch is recorded and skipped; a persistence
//! failure stops that provider's remaining posts. Neither affects the
//! other providers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use socialfeed_common::{Config, Platform, Post};
use socialfeed_providers::{Provider, ProviderRegistry};
use tracing::{debug, error, info, warn};

use crate::assets::AssetRegistrar;
use crate::error::{ImportError, Result, StoreError};
use crate::store::{AssetStore, ElementType, PostStore, Tag, TagService};

/// Root tag every imported post receives. Hashtag tags nest under it.
pub const SOCIAL_MEDIA_TAG: &str = "Social Media";

/// Where imported posts and media go.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Local directory downloads are written to, one subdirectory per platform.
    pub media_dir: PathBuf,
    pub posts_folder: String,
    pub assets_folder: String,
    /// Posts requested from each provider.
    pub post_limit: u32,
}

impl From<&Config> for ImportSettings {
    fn from(config: &Config) -> Self {
        Self {
            media_dir: config.media_dir.clone(),
            posts_folder: config.posts_folder.clone(),
            assets_folder: config.assets_folder.clone(),
            post_limit: config.post_limit,
        }
    }
}

/// What happened to one provider during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderOutcome {
    /// Excluded by the platform filter. No side effects.
    Skipped,
    NotConfigured,
    FetchFailed { error: String },
    Imported { count: usize },
    /// Persistence failed part-way; `imported` posts were written before it.
    Aborted { imported: usize, error: String },
}

impl ProviderOutcome {
    pub fn imported(&self) -> usize {
        match self {
            ProviderOutcome::Imported { count } => *count,
            ProviderOutcome::Aborted { imported, .. } => *imported,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    outcomes: BTreeMap<Platform, ProviderOutcome>,
}

impl ImportReport {
    pub fn outcome(&self, platform: Platform) -> Option<&ProviderOutcome> {
        self.outcomes.get(&platform)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (Platform, &ProviderOutcome)> {
        self.outcomes.iter().map(|(p, o)| (*p, o))
    }

    /// Posts imported across all providers.
    pub fn total(&self) -> usize {
        self.outcomes.values().map(ProviderOutcome::imported).sum()
    }

    fn record(&mut self, platform: Platform, outcome: ProviderOutcome) {
        self.outcomes.insert(platform, outcome);
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .outcomes
            .iter()
            .filter(|(_, o)| **o != ProviderOutcome::Skipped)
            .map(|(p, o)| match o {
                ProviderOutcome::Skipped => format!("{p}=skipped"),
                ProviderOutcome::NotConfigured => format!("{p}=not_configured"),
                ProviderOutcome::FetchFailed { .. } => format!("{p}=fetch_failed"),
                ProviderOutcome::Imported { count } => format!("{p}={count}"),
                ProviderOutcome::Aborted { imported, .. } => format!("{p}={imported}(aborted)"),
            })
            .collect();
        write!(f, "{} imported [{}]", self.total(), parts.join(", "))
    }
}

pub struct ImportService {
    registry: ProviderRegistry,
    posts: Arc<dyn PostStore>,
    tags: Arc<dyn TagService>,
    assets: AssetRegistrar,
    settings: ImportSettings,
}

impl ImportService {
    pub fn new(
        registry: ProviderRegistry,
        posts: Arc<dyn PostStore>,
        assets: Arc<dyn AssetStore>,
        tags: Arc<dyn TagService>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            registry,
            posts,
            tags,
            assets: AssetRegistrar::new(assets),
            settings,
        }
    }

    /// Import from every eligible provider and return the number of posts
    /// written. Only fails when the run cannot start at all.
    pub async fn import_posts(&self, platform: Option<Platform>) -> Result<usize> {
        Ok(self.import_report(platform).await?.total())
    }

    /// Import and return the per-provider outcome.
    pub async fn import_report(&self, platform: Option<Platform>) -> Result<ImportReport> {
        self.posts
            .create_folder_if_missing(&self.settings.posts_folder)
            .await?;
        self.posts
            .create_folder_if_missing(&self.settings.assets_folder)
            .await?;

        let mut report = ImportReport::default();
        for (p, provider) in self.registry.iter() {
            if platform.is_some_and(|wanted| wanted != p) {
                report.record(p, ProviderOutcome::Skipped);
                continue;
            }

            let outcome = self.import_provider(provider.as_ref()).await;
            report.record(p, outcome);
        }

        info!(%report, "Social media import finished");
        Ok(report)
    }

    async fn import_provider(&self, provider: &dyn Provider) -> ProviderOutcome {
        let platform = provider.platform();

        if !provider.is_configured() {
            warn!(%platform, "{}", ImportError::NotConfigured(platform));
            return ProviderOutcome::NotConfigured;
        }

        let posts = match provider.fetch_posts(self.settings.post_limit).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(%platform, error = %e, "Fetch failed, skipping provider");
                return ProviderOutcome::FetchFailed {
                    error: e.to_string(),
                };
            }
        };
        info!(%platform, count = posts.len(), "Fetched posts");

        let root_tag = match self.tags.get_or_create_tag(SOCIAL_MEDIA_TAG, None).await {
            Ok(tag) => tag,
            Err(e) => return self.aborted(platform, 0, e),
        };

        let mut imported = 0;
        for post in posts {
            let external_id = post.external_id.clone();
            match self.import_post(provider, post, &root_tag).await {
                Ok(()) => imported += 1,
                Err(e) => {
                    error!(%platform, %external_id, "Stopping provider after persistence failure");
                    return self.aborted(platform, imported, e);
                }
            }
        }

        info!(%platform, imported, "Imported posts");
        ProviderOutcome::Imported { count: imported }
    }

    fn aborted(&self, platform: Platform, imported: usize, e: StoreError) -> ProviderOutcome {
        let e = ImportError::Persistence(e);
        error!(%platform, imported, error = %e, "Provider import aborted");
        ProviderOutcome::Aborted {
            imported,
            error: e.to_string(),
        }
    }

    async fn import_post(
        &self,
        provider: &dyn Provider,
        mut post: Post,
        root_tag: &Tag,
    ) -> std::result::Result<(), StoreError> {
        if post.has_media() {
            self.attach_media(provider, &mut post).await;
        }

        if let Some(existing) = self
            .posts
            .find_by_external_id(post.platform, &post.external_id)
            .await?
        {
            debug!(platform = %post.platform, external_id = %post.external_id, "Updating existing post");
            post.id = existing.id;
        }
        self.posts.upsert(&self.settings.posts_folder, &post).await?;

        self.apply_tags(&post, root_tag).await
    }

    /// Download every attachment, then register the ones that landed on disk.
    /// Failures here only cost the affected media item.
    async fn attach_media(&self, provider: &dyn Provider, post: &mut Post) {
        let target_dir = self.settings.media_dir.join(post.platform.as_str());
        let mut media = provider.download_media(post, &target_dir).await;

        for item in media.iter_mut() {
            let Some(local_path) = item.local_path.as_deref() else {
                continue;
            };
            match self
                .assets
                .register_asset(local_path, &self.settings.assets_folder)
                .await
            {
                Ok(id) => item.asset_id = Some(id),
                Err(e) => warn!(
                    platform = %post.platform,
                    external_id = %post.external_id,
                    path = %local_path.display(),
                    error = %e,
                    "Asset registration failed"
                ),
            }
        }

        post.media = media;
    }

    async fn apply_tags(&self, post: &Post, root_tag: &Tag) -> std::result::Result<(), StoreError> {
        let element_id = post.id.as_str();
        self.tags
            .assign_tag(ElementType::Post, element_id, root_tag)
            .await?;

        for hashtag in &post.hashtags {
            let tag = self.tags.get_or_create_tag(hashtag, Some(root_tag)).await?;
            self.tags.assign_tag(ElementType::Post, element_id, &tag).await?;
        }
        Ok(())
    }
}
