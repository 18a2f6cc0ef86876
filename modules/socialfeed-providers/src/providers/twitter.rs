// Twitter provider: one page of v2 recent search for the configured query,
// with author and media expansions resolved from `includes`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use socialfeed_common::{
    extract_hashtags, extract_mentions, MediaItem, MediaType, Platform, Post, TwitterCredentials,
};
use tracing::info;

use crate::error::Result;
use crate::http::send_json;
use crate::media::MediaDownloader;
use crate::provider::Provider;
use crate::providers::{count, page_size, parse_timestamp};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Recent search rejects `max_results` below 10.
const MIN_RESULTS: u32 = 10;

const TWEET_FIELDS: &str = "created_at,public_metrics,entities";
const EXPANSIONS: &str = "author_id,attachments.media_keys";
const USER_FIELDS: &str = "name,username,profile_image_url";
const MEDIA_FIELDS: &str = "url,preview_image_url,type";

pub struct TwitterProvider {
    credentials: TwitterCredentials,
    client: reqwest::Client,
    downloader: MediaDownloader,
    search_url: String,
}

impl TwitterProvider {
    pub fn new(
        credentials: TwitterCredentials,
        client: reqwest::Client,
        downloader: MediaDownloader,
    ) -> Self {
        Self {
            credentials,
            client,
            downloader,
            search_url: SEARCH_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.search_url = format!("{base_url}/2/tweets/search/recent");
        self
    }
}

#[async_trait]
impl Provider for TwitterProvider {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn is_configured(&self) -> bool {
        let c = &self.credentials;
        !c.api_key.is_empty()
            && !c.api_secret.is_empty()
            && !c.bearer_token.is_empty()
            && !c.search_query.trim().is_empty()
    }

    async fn fetch_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let max_results = page_size(limit).max(MIN_RESULTS);
        info!(query = %self.credentials.search_query, max_results, "twitter: searching recent tweets");

        let max_results_param = max_results.to_string();
        let request = self
            .client
            .get(&self.search_url)
            .bearer_auth(&self.credentials.bearer_token)
            .query(&[
                ("query", self.credentials.search_query.as_str()),
                ("max_results", max_results_param.as_str()),
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", EXPANSIONS),
                ("user.fields", USER_FIELDS),
                ("media.fields", MEDIA_FIELDS),
            ]);

        let response: TwitterSearchResponse = send_json(Platform::Twitter, request).await?;
        let mut posts = map_search(response);
        // max_results was raised to the API minimum; honour the caller's cap.
        posts.truncate(page_size(limit) as usize);
        info!(count = posts.len(), "twitter: mapped posts");
        Ok(posts)
    }

    async fn download_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        self.downloader.download_post_media(post, target_dir).await
    }
}

/// Map one search response, resolving authors and attachments from `includes`.
pub fn map_search(response: TwitterSearchResponse) -> Vec<Post> {
    let includes = response.includes.unwrap_or_default();
    let users: HashMap<&str, &TwitterUser> =
        includes.users.iter().map(|u| (u.id.as_str(), u)).collect();
    let media: HashMap<&str, &TwitterMedia> = includes
        .media
        .iter()
        .map(|m| (m.media_key.as_str(), m))
        .collect();

    response
        .data
        .into_iter()
        .map(|tweet| map_tweet(tweet, &users, &media))
        .collect()
}

fn map_tweet(
    tweet: Tweet,
    users: &HashMap<&str, &TwitterUser>,
    media: &HashMap<&str, &TwitterMedia>,
) -> Post {
    let mut post = Post::new(Platform::Twitter, tweet.id);
    post.content = tweet.text;
    post.published_at = parse_timestamp(tweet.created_at.as_deref());

    let username = tweet
        .author_id
        .as_deref()
        .and_then(|id| users.get(id))
        .map(|u| u.username.as_str())
        .filter(|u| !u.is_empty());
    post.url = Some(match username {
        Some(username) => format!("https://twitter.com/{username}/status/{}", post.external_id),
        None => format!("https://twitter.com/i/web/status/{}", post.external_id),
    });

    if let Some(metrics) = tweet.public_metrics {
        post.like_count = count(metrics.like_count);
        post.share_count = count(metrics.retweet_count);
        post.comment_count = count(metrics.reply_count);
    }

    match tweet.entities {
        Some(entities) => {
            for h in entities.hashtags {
                post.add_hashtag(h.tag);
            }
            for m in entities.mentions {
                post.add_mention(m.username);
            }
        }
        None => {
            for tag in extract_hashtags(&post.content) {
                post.add_hashtag(tag);
            }
            for handle in extract_mentions(&post.content) {
                post.add_mention(handle);
            }
        }
    }

    let keys = tweet.attachments.map(|a| a.media_keys).unwrap_or_default();
    for key in &keys {
        let Some(m) = media.get(key.as_str()) else {
            continue;
        };
        let (media_type, url) = if m.kind == "photo" {
            (MediaType::Image, m.url.as_deref())
        } else {
            // Video and animated_gif only expose a preview frame.
            (MediaType::Video, m.preview_image_url.as_deref())
        };
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            post.add_media(media_type, url.to_string());
        }
    }

    post
}

// --- v2 API response types ---

#[derive(Debug, Deserialize)]
pub struct TwitterSearchResponse {
    /// Absent when the search matched nothing.
    #[serde(default)]
    pub data: Vec<Tweet>,
    pub includes: Option<TwitterIncludes>,
}

#[derive(Debug, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub created_at: Option<String>,
    pub author_id: Option<String>,
    pub public_metrics: Option<TwitterMetrics>,
    pub entities: Option<TwitterEntities>,
    pub attachments: Option<TwitterAttachments>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterMetrics {
    pub like_count: Option<i64>,
    pub retweet_count: Option<i64>,
    pub reply_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterEntities {
    #[serde(default)]
    pub hashtags: Vec<TwitterHashtag>,
    #[serde(default)]
    pub mentions: Vec<TwitterMention>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterHashtag {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct TwitterMention {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct TwitterAttachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwitterIncludes {
    #[serde(default)]
    pub users: Vec<TwitterUser>,
    #[serde(default)]
    pub media: Vec<TwitterMedia>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterMedia {
    pub media_key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Option<String>,
    pub preview_image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::test_server::TestServer;

    fn response(json: &str) -> TwitterSearchResponse {
        serde_json::from_str(json).expect("invalid test JSON")
    }

    fn credentials(query: &str) -> TwitterCredentials {
        TwitterCredentials {
            api_key: "key".into(),
            api_secret: "secret".into(),
            bearer_token: "bearer".into(),
            search_query: query.into(),
        }
    }

    #[test]
    fn blank_query_means_not_configured() {
        let client = reqwest::Client::new();
        let downloader = MediaDownloader::new(client.clone());
        let blank = TwitterProvider::new(credentials("  "), client.clone(), downloader.clone());
        let set = TwitterProvider::new(credentials("#rust"), client, downloader);
        assert!(!blank.is_configured());
        assert!(set.is_configured());
    }

    #[test]
    fn empty_search_result_has_no_data_key() {
        let posts = map_search(response(r#"{"meta":{"result_count":0}}"#));
        assert!(posts.is_empty());
    }

    #[test]
    fn falls_back_to_web_status_url_without_author() {
        let posts = map_search(response(r#"{"data":[{"id":"77","text":"hi"}]}"#));
        assert_eq!(
            posts[0].url.as_deref(),
            Some("https://twitter.com/i/web/status/77")
        );
    }

    #[test]
    fn text_extraction_used_when_entities_missing() {
        let posts = map_search(response(
            r#"{"data":[{"id":"1","text":"ping @ferris about #rustlang"}]}"#,
        ));
        assert_eq!(posts[0].hashtags, vec!["rustlang"]);
        assert_eq!(posts[0].mentions, vec!["ferris"]);
    }

    #[test]
    fn unknown_media_key_is_ignored() {
        let posts = map_search(response(
            r#"{"data":[{"id":"1","text":"x","attachments":{"media_keys":["nope"]}}],
                "includes":{"media":[]}}"#,
        ));
        assert!(posts[0].media.is_empty());
    }

    fn provider(base_url: &str) -> TwitterProvider {
        let client = reqwest::Client::new();
        TwitterProvider::new(credentials("#rust"), client.clone(), MediaDownloader::new(client))
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn rate_limited_search_is_api_error() {
        let server =
            TestServer::start(vec![("429 Too Many Requests", r#"{"title":"Too Many Requests"}"#)])
                .await;
        let err = provider(server.base_url()).fetch_posts(5).await.unwrap_err();
        assert!(
            matches!(err, FetchError::Api { status: 429, platform: Platform::Twitter, .. }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn small_limit_is_raised_for_the_api_and_truncated_after() {
        let server = TestServer::start(vec![(
            "200 OK",
            r#"{"data":[{"id":"1","text":"a"},{"id":"2","text":"b"},{"id":"3","text":"c"}]}"#,
        )])
        .await;

        let posts = provider(server.base_url()).fetch_posts(2).await.unwrap();

        let ids: Vec<_> = posts.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        let request = &server.requests()[0];
        assert!(request.starts_with("GET /2/tweets/search/recent?"), "{request}");
        assert!(request.contains("max_results=10"), "{request}");
    }
}
