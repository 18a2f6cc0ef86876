// Test doubles for the import pipeline.
//
// - MockProvider (Provider): canned posts, optional fetch failure, downloads
//   that write the remote URL as file content into the target directory
// - FlakyPostStore (PostStore): wraps InMemoryStore, fails upserts after N
//
// Plus `sample_post` for building feed items.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use socialfeed_common::{MediaItem, MediaType, Platform, Post};
use socialfeed_providers::{media_filename, FetchError, Provider};

use crate::error::StoreError;
use crate::store::{InMemoryStore, PostStore, StoreResult};

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Builder pattern: `.with_posts()`, `.unconfigured()`, `.failing()`,
/// `.failing_downloads()`.
pub struct MockProvider {
    platform: Platform,
    configured: bool,
    posts: Vec<Post>,
    fail_status: Option<u16>,
    downloads_fail: bool,
    fetch_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            configured: true,
            posts: Vec::new(),
            fail_status: None,
            downloads_fail: false,
            fetch_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Every fetch fails with an API error carrying `status`.
    pub fn failing(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    /// Every download leaves media without a local path.
    pub fn failing_downloads(mut self) -> Self {
        self.downloads_fail = true;
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch_posts(&self, limit: u32) -> socialfeed_providers::Result<Vec<Post>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(FetchError::Api {
                platform: self.platform,
                status,
                body: "mock failure".to_string(),
            });
        }
        Ok(self.posts.iter().take(limit as usize).cloned().collect())
    }

    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.downloads_fail {
            return post.media.clone();
        }

        let mut media = Vec::with_capacity(post.media.len());
        for (index, item) in post.media.iter().enumerate() {
            let mut item = item.clone();
            let target = target_dir.join(media_filename(post, index, &item));
            let written = async {
                tokio::fs::create_dir_all(target_dir).await?;
                tokio::fs::write(&target, item.remote_url.as_bytes()).await
            }
            .await;
            if written.is_ok() {
                item.local_path = Some(target);
            }
            media.push(item);
        }
        media
    }
}

// ---------------------------------------------------------------------------
// FlakyPostStore
// ---------------------------------------------------------------------------

/// Delegates to an `InMemoryStore` but fails every upsert after the first
/// `succeed` ones.
pub struct FlakyPostStore {
    inner: Arc<InMemoryStore>,
    succeed: usize,
    upserts: AtomicUsize,
}

impl FlakyPostStore {
    pub fn new(inner: Arc<InMemoryStore>, succeed: usize) -> Self {
        Self {
            inner,
            succeed,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PostStore for FlakyPostStore {
    async fn find_by_external_id(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> StoreResult<Option<Post>> {
        self.inner.find_by_external_id(platform, external_id).await
    }

    async fn upsert(&self, folder: &str, post: &Post) -> StoreResult<()> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) >= self.succeed {
            return Err(StoreError::Other("connection reset".to_string()));
        }
        self.inner.upsert(folder, post).await
    }

    async fn create_folder_if_missing(&self, path: &str) -> StoreResult<()> {
        self.inner.create_folder_if_missing(path).await
    }

    async fn count_posts(&self) -> StoreResult<usize> {
        self.inner.count_posts().await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A post with `content` and one image per URL, in order. Hashtags are
/// extracted from the content the way providers do.
pub fn sample_post(platform: Platform, external_id: &str, content: &str, media: &[&str]) -> Post {
    let mut post = Post::new(platform, external_id);
    post.content = content.to_string();
    for url in media {
        post.add_media(MediaType::Image, *url);
    }
    for tag in socialfeed_common::extract_hashtags(content) {
        post.add_hashtag(tag);
    }
    post
}
