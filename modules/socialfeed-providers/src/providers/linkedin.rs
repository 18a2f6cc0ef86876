// LinkedIn provider: client-credentials OAuth (token fetched lazily and kept
// for the life of the process), then one page of the organization's posts
// from the versioned REST API.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use socialfeed_common::{
    extract_bracket_mentions, extract_hashtags, LinkedinCredentials, MediaItem, MediaType,
    Platform, Post,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::http::send_json;
use crate::media::MediaDownloader;
use crate::provider::Provider;
use crate::providers::{count, page_size, timestamp_from_millis};

const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const POSTS_URL: &str = "https://api.linkedin.com/rest/posts";
const API_VERSION: &str = "202405";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";
const POST_FIELDS: &str =
    "id,author,commentary,content,created,likesSummary,commentsSummary,repostsSummary";

pub struct LinkedinProvider {
    credentials: LinkedinCredentials,
    client: reqwest::Client,
    downloader: MediaDownloader,
    token_url: String,
    posts_url: String,
    access_token: Mutex<Option<String>>,
}

impl LinkedinProvider {
    pub fn new(
        credentials: LinkedinCredentials,
        client: reqwest::Client,
        downloader: MediaDownloader,
    ) -> Self {
        Self {
            credentials,
            client,
            downloader,
            token_url: TOKEN_URL.to_string(),
            posts_url: POSTS_URL.to_string(),
            access_token: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.token_url = format!("{base_url}/oauth/v2/accessToken");
        self.posts_url = format!("{base_url}/rest/posts");
        self
    }

    /// Cached bearer token, authenticating on first use.
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        info!("linkedin: no access token cached, authenticating");
        let request = self.client.post(&self.token_url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ]);

        let resp: TokenResponse = send_json(Platform::Linkedin, request)
            .await
            .map_err(|e| FetchError::auth(Platform::Linkedin, format!("token request: {e}")))?;

        let token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FetchError::auth(Platform::Linkedin, "no access_token in response"))?;

        *cached = Some(token.clone());
        Ok(token)
    }

    async fn forget_token(&self) {
        *self.access_token.lock().await = None;
    }
}

#[async_trait]
impl Provider for LinkedinProvider {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    fn is_configured(&self) -> bool {
        let c = &self.credentials;
        !c.client_id.is_empty() && !c.client_secret.is_empty() && !c.organization_id.is_empty()
    }

    async fn fetch_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let limit = page_size(limit);
        info!(organization_id = %self.credentials.organization_id, limit, "linkedin: fetching posts");

        let token = self.bearer_token().await?;
        let author = format!("urn:li:organization:{}", self.credentials.organization_id);
        let limit_param = limit.to_string();
        let request = self
            .client
            .get(&self.posts_url)
            .bearer_auth(&token)
            .header("LinkedIn-Version", API_VERSION)
            .header("X-Restli-Protocol-Version", RESTLI_PROTOCOL_VERSION)
            .query(&[
                ("author", author.as_str()),
                ("q", "author"),
                ("count", limit_param.as_str()),
                ("fields", POST_FIELDS),
            ]);

        let page: LinkedinPostsPage = match send_json(Platform::Linkedin, request).await {
            Ok(page) => page,
            Err(err) => {
                if matches!(err, FetchError::Api { status: 401, .. }) {
                    warn!("linkedin: access token rejected, it will be refreshed on the next run");
                    self.forget_token().await;
                }
                return Err(err);
            }
        };

        let posts = map_posts(page);
        info!(count = posts.len(), "linkedin: mapped posts");
        Ok(posts)
    }

    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        self.downloader.download_post_media(post, target_dir).await
    }
}

/// Map one posts page, preserving feed order.
pub fn map_posts(page: LinkedinPostsPage) -> Vec<Post> {
    page.elements.into_iter().map(map_item).collect()
}

fn map_item(item: LinkedinPost) -> Post {
    let mut post = Post::new(Platform::Linkedin, item.id);
    post.content = item.commentary.unwrap_or_default();
    post.published_at = timestamp_from_millis(item.created.and_then(|c| c.time));
    post.url = Some(format!(
        "https://www.linkedin.com/feed/update/{}",
        post.external_id
    ));
    post.like_count = count(item.likes_summary.and_then(|s| s.total_likes));
    post.comment_count = count(item.comments_summary.and_then(|s| s.total_comments));
    post.share_count = count(item.reposts_summary.and_then(|s| s.total_reposts));

    let media = item
        .content
        .and_then(|c| c.media)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();
    for m in media {
        let Some(url) = m.url.filter(|u| !u.is_empty()) else {
            continue;
        };
        let media_type = if m.kind.as_deref().is_some_and(|t| t.to_uppercase().contains("VIDEO")) {
            MediaType::Video
        } else {
            MediaType::Image
        };
        post.add_media(media_type, url);
    }

    for tag in extract_hashtags(&post.content) {
        post.add_hashtag(tag);
    }
    for name in extract_bracket_mentions(&post.content) {
        post.add_mention(name);
    }

    post
}

// --- REST API response types ---

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedinPostsPage {
    #[serde(default)]
    pub elements: Vec<LinkedinPost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedinPost {
    pub id: String,
    pub commentary: Option<String>,
    pub created: Option<LinkedinCreated>,
    pub content: Option<LinkedinContent>,
    pub likes_summary: Option<LinkedinLikes>,
    pub comments_summary: Option<LinkedinComments>,
    pub reposts_summary: Option<LinkedinReposts>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedinCreated {
    /// Milliseconds since the Unix epoch.
    pub time: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedinContent {
    pub media: Option<OneOrMany<LinkedinMedia>>,
}

/// `content.media` is a single object for single-media posts and a list
/// for multi-image posts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkedinMedia {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedinLikes {
    pub total_likes: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedinComments {
    pub total_comments: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedinReposts {
    pub total_reposts: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;

    fn provider(base_url: &str) -> LinkedinProvider {
        let client = reqwest::Client::new();
        LinkedinProvider::new(
            LinkedinCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                organization_id: "1".into(),
            },
            client.clone(),
            MediaDownloader::new(client),
        )
        .with_base_url(base_url)
    }

    #[test]
    fn single_media_object_is_accepted() {
        let page: LinkedinPostsPage = serde_json::from_str(
            r#"{"elements":[{"id":"urn:li:share:1","content":{"media":{"type":"VIDEO","url":"https://x/v.mp4"}}}]}"#,
        )
        .unwrap();
        let posts = map_posts(page);
        assert_eq!(posts[0].media.len(), 1);
        assert_eq!(posts[0].media[0].media_type, MediaType::Video);
    }

    #[test]
    fn permalink_is_built_from_id() {
        let page: LinkedinPostsPage =
            serde_json::from_str(r#"{"elements":[{"id":"urn:li:share:9"}]}"#).unwrap();
        let posts = map_posts(page);
        assert_eq!(
            posts[0].url.as_deref(),
            Some("https://www.linkedin.com/feed/update/urn:li:share:9")
        );
    }

    #[tokio::test]
    async fn failed_token_request_is_auth_error() {
        let server = TestServer::start(vec![(
            "401 Unauthorized",
            r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#,
        )])
        .await;
        let provider = provider(server.base_url());

        let err = provider.fetch_posts(10).await.unwrap_err();

        assert!(matches!(err, FetchError::Auth { platform: Platform::Linkedin, .. }), "{err}");
        assert!(provider.access_token.lock().await.is_none());
        let requests = server.requests();
        assert_eq!(requests.len(), 1, "posts must not be requested without a token");
        assert!(requests[0].starts_with("POST /oauth/v2/accessToken"), "{}", requests[0]);
    }

    #[tokio::test]
    async fn token_response_without_token_is_auth_error() {
        let server = TestServer::start(vec![("200 OK", "{}")]).await;
        let err = provider(server.base_url()).fetch_posts(10).await.unwrap_err();
        assert!(matches!(err, FetchError::Auth { .. }), "{err}");
    }

    #[tokio::test]
    async fn token_is_cached_across_fetches() {
        let server = TestServer::start(vec![
            ("200 OK", r#"{"access_token":"t1","expires_in":5184000}"#),
            ("200 OK", r#"{"elements":[{"id":"urn:li:share:1","commentary":"hello"}]}"#),
            ("200 OK", r#"{"elements":[]}"#),
        ])
        .await;
        let provider = provider(server.base_url());

        assert_eq!(provider.fetch_posts(10).await.unwrap().len(), 1);
        assert!(provider.fetch_posts(10).await.unwrap().is_empty());

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("POST /oauth/v2/accessToken"));
        assert!(requests[1].starts_with("GET /rest/posts?"));
        assert!(requests[2].starts_with("GET /rest/posts?"));
    }

    #[tokio::test]
    async fn rejected_token_is_forgotten() {
        let server = TestServer::start(vec![
            ("200 OK", r#"{"access_token":"t1","expires_in":5184000}"#),
            ("401 Unauthorized", r#"{"status":401,"message":"Expired access token"}"#),
        ])
        .await;
        let provider = provider(server.base_url());

        let err = provider.fetch_posts(10).await.unwrap_err();

        assert!(matches!(err, FetchError::Api { status: 401, .. }), "{err}");
        assert!(provider.access_token.lock().await.is_none());
        assert_eq!(server.requests().len(), 2);
    }
}
