// Instagram provider: one page of /{user_id}/media from the Graph API,
// with carousel children expanded inline.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use socialfeed_common::{
    extract_hashtags, extract_mentions, InstagramCredentials, MediaItem, MediaType, Platform, Post,
};
use tracing::info;

use crate::error::Result;
use crate::http::send_json;
use crate::media::MediaDownloader;
use crate::provider::Provider;
use crate::providers::{count, page_size, parse_timestamp};

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

const MEDIA_FIELDS: &str = "id,caption,media_type,media_url,thumbnail_url,permalink,timestamp,\
username,like_count,comments_count,children{media_url,media_type,thumbnail_url}";

pub struct InstagramProvider {
    credentials: InstagramCredentials,
    client: reqwest::Client,
    downloader: MediaDownloader,
    graph_url: String,
}

impl InstagramProvider {
    pub fn new(
        credentials: InstagramCredentials,
        client: reqwest::Client,
        downloader: MediaDownloader,
    ) -> Self {
        Self {
            credentials,
            client,
            downloader,
            graph_url: GRAPH_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.graph_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl Provider for InstagramProvider {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn is_configured(&self) -> bool {
        !self.credentials.user_id.is_empty() && !self.credentials.access_token.is_empty()
    }

    async fn fetch_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let limit = page_size(limit);
        info!(user_id = %self.credentials.user_id, limit, "instagram: fetching media");

        let limit_param = limit.to_string();
        let request = self
            .client
            .get(format!("{}/{}/media", self.graph_url, self.credentials.user_id))
            .query(&[
                ("fields", MEDIA_FIELDS),
                ("access_token", self.credentials.access_token.as_str()),
                ("limit", limit_param.as_str()),
            ]);

        let page: InstagramMediaPage = send_json(Platform::Instagram, request).await?;
        let posts = map_media(page);
        info!(count = posts.len(), "instagram: mapped posts");
        Ok(posts)
    }

    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        self.downloader.download_post_media(post, target_dir).await
    }
}

/// Map one `/media` page to posts, preserving feed order.
pub fn map_media(page: InstagramMediaPage) -> Vec<Post> {
    page.data.into_iter().map(map_item).collect()
}

fn map_item(item: InstagramMedia) -> Post {
    let mut post = Post::new(Platform::Instagram, item.id);
    post.content = item.caption.unwrap_or_default();
    post.published_at = parse_timestamp(item.timestamp.as_deref());
    post.url = item.permalink;
    post.like_count = count(item.like_count);
    post.comment_count = count(item.comments_count);

    for tag in extract_hashtags(&post.content) {
        post.add_hashtag(tag);
    }
    for handle in extract_mentions(&post.content) {
        post.add_mention(handle);
    }

    match item.media_type.as_deref() {
        Some("CAROUSEL_ALBUM") => {
            let children = item.children.map(|c| c.data).unwrap_or_default();
            for child in children {
                push_media(
                    &mut post,
                    child.media_type.as_deref(),
                    child.media_url,
                    child.thumbnail_url,
                );
            }
        }
        media_type => push_media(&mut post, media_type, item.media_url, item.thumbnail_url),
    }

    post
}

/// IMAGE yields one image. VIDEO yields the video followed by its
/// thumbnail as a secondary image. Anything else yields nothing.
fn push_media(
    post: &mut Post,
    media_type: Option<&str>,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
) {
    let media_url = media_url.filter(|u| !u.is_empty());
    let thumbnail_url = thumbnail_url.filter(|u| !u.is_empty());

    match media_type {
        Some("IMAGE") => {
            if let Some(url) = media_url {
                post.add_media(MediaType::Image, url);
            }
        }
        Some("VIDEO") => {
            if let Some(url) = media_url {
                post.add_media(MediaType::Video, url);
            }
            if let Some(url) = thumbnail_url {
                post.add_media(MediaType::Image, url);
            }
        }
        _ => {}
    }
}

// --- Graph API response types ---

#[derive(Debug, Deserialize)]
pub struct InstagramMediaPage {
    pub data: Vec<InstagramMedia>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramMedia {
    pub id: String,
    pub caption: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub permalink: Option<String>,
    pub timestamp: Option<String>,
    pub like_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub children: Option<InstagramChildren>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramChildren {
    #[serde(default)]
    pub data: Vec<InstagramChild>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramChild {
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
}
