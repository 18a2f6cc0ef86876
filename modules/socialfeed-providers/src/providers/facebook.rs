// Facebook provider: exchanges the configured user token for a Page Access
// Token, then reads one page of the page feed from the Graph API.

use std::path::Path;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use socialfeed_common::{
    extract_hashtags, extract_mentions, FacebookCredentials, MediaItem, MediaType, Platform, Post,
};
use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::http::send_json;
use crate::media::MediaDownloader;
use crate::provider::Provider;
use crate::providers::{count, page_size, parse_timestamp};

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

const FEED_FIELDS: &str = "id,message,created_time,permalink_url,\
attachments{type,media_type,url,media,subattachments},\
likes.summary(true).limit(0),comments.summary(true).limit(0),shares";

type HmacSha256 = Hmac<Sha256>;

pub struct FacebookProvider {
    credentials: FacebookCredentials,
    client: reqwest::Client,
    downloader: MediaDownloader,
    graph_url: String,
}

impl FacebookProvider {
    pub fn new(
        credentials: FacebookCredentials,
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

    /// `appsecret_proof` for a token: HMAC-SHA256 keyed with the app secret.
    fn appsecret_proof(&self, token: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.app_secret.as_bytes())
            .map_err(|e| FetchError::auth(Platform::Facebook, e.to_string()))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn page_access_token(&self) -> Result<String> {
        let user_token = self.credentials.access_token.as_str();
        let proof = self.appsecret_proof(user_token)?;
        let request = self
            .client
            .get(format!("{}/{}", self.graph_url, self.credentials.page_id))
            .query(&[
                ("fields", "access_token"),
                ("access_token", user_token),
                ("appsecret_proof", proof.as_str()),
            ]);

        let resp: PageTokenResponse = send_json(Platform::Facebook, request)
            .await
            .map_err(|e| FetchError::auth(Platform::Facebook, format!("page token exchange: {e}")))?;

        resp.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                FetchError::auth(Platform::Facebook, "no page access token in exchange response")
            })
    }
}

#[async_trait]
impl Provider for FacebookProvider {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn is_configured(&self) -> bool {
        let c = &self.credentials;
        !c.access_token.is_empty()
            && !c.app_id.is_empty()
            && !c.app_secret.is_empty()
            && !c.page_id.is_empty()
    }

    async fn fetch_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let limit = page_size(limit);
        info!(page_id = %self.credentials.page_id, limit, "facebook: fetching feed");

        let page_token = self.page_access_token().await?;
        debug!("facebook: obtained page access token");

        let proof = self.appsecret_proof(&page_token)?;
        let limit_param = limit.to_string();
        let request = self
            .client
            .get(format!("{}/{}/feed", self.graph_url, self.credentials.page_id))
            .query(&[
                ("fields", FEED_FIELDS),
                ("access_token", page_token.as_str()),
                ("appsecret_proof", proof.as_str()),
                ("limit", limit_param.as_str()),
            ]);

        let feed: FacebookFeed = send_json(Platform::Facebook, request).await?;
        let posts = map_feed(feed);
        info!(count = posts.len(), "facebook: mapped posts");
        Ok(posts)
    }

    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        self.downloader.download_post_media(post, target_dir).await
    }
}

/// Map one feed page to posts, preserving feed order.
pub fn map_feed(feed: FacebookFeed) -> Vec<Post> {
    feed.data.into_iter().map(map_item).collect()
}

fn map_item(item: FacebookFeedItem) -> Post {
    let mut post = Post::new(Platform::Facebook, item.id);
    post.content = item.message.unwrap_or_default();
    post.published_at = parse_timestamp(item.created_time.as_deref());
    post.url = item.permalink_url;
    post.like_count = count(item.likes.and_then(|l| l.summary).and_then(|s| s.total_count));
    post.comment_count = count(
        item.comments
            .and_then(|c| c.summary)
            .and_then(|s| s.total_count),
    );
    post.share_count = count(item.shares.and_then(|s| s.count));

    for tag in extract_hashtags(&post.content) {
        post.add_hashtag(tag);
    }
    for handle in extract_mentions(&post.content) {
        post.add_mention(handle);
    }

    let attachments = item.attachments.map(|a| a.data).unwrap_or_default();
    for attachment in attachments {
        push_attachment(&mut post, attachment);
    }

    post
}

/// Albums contribute their sub-attachments; everything else contributes itself.
fn push_attachment(post: &mut Post, attachment: FacebookAttachment) {
    let children = attachment
        .subattachments
        .as_ref()
        .map(|s| s.data.as_slice())
        .unwrap_or_default();

    if !children.is_empty() {
        for child in children {
            push_single(post, child);
        }
        return;
    }
    push_single(post, &attachment);
}

fn push_single(post: &mut Post, attachment: &FacebookAttachment) {
    let media_type = classify(attachment);
    let media = attachment.media.as_ref();
    let image_src = media.and_then(|m| m.image.as_ref()).and_then(|i| i.src.clone());

    let url = match media_type {
        MediaType::Video => media.and_then(|m| m.source.clone()).or(image_src),
        MediaType::Image => image_src,
    };

    if let Some(url) = url.filter(|u| !u.is_empty()) {
        post.add_media(media_type, url);
    }
}

fn classify(attachment: &FacebookAttachment) -> MediaType {
    let is_video = [attachment.media_type.as_deref(), attachment.kind.as_deref()]
        .into_iter()
        .flatten()
        .any(|t| matches!(t, "video" | "animated_image_video"));

    if is_video {
        MediaType::Video
    } else {
        MediaType::Image
    }
}

// --- Graph API response types ---

#[derive(Debug, Deserialize)]
struct PageTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookFeed {
    pub data: Vec<FacebookFeedItem>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookFeedItem {
    pub id: String,
    pub message: Option<String>,
    pub created_time: Option<String>,
    pub permalink_url: Option<String>,
    pub attachments: Option<FacebookAttachments>,
    pub likes: Option<FacebookEdge>,
    pub comments: Option<FacebookEdge>,
    pub shares: Option<FacebookShares>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookAttachments {
    #[serde(default)]
    pub data: Vec<FacebookAttachment>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookAttachment {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub media_type: Option<String>,
    pub media: Option<FacebookMedia>,
    pub subattachments: Option<FacebookAttachments>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookMedia {
    pub image: Option<FacebookImage>,
    /// Video file URL, present on video attachments.
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookImage {
    pub src: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookEdge {
    pub summary: Option<FacebookSummary>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookSummary {
    pub total_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookShares {
    pub count: Option<i64>,
}
