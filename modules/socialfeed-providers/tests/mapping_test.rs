//! Mapping tests: recorded platform responses → Vec<Post>.
//!
//! Each test: load a JSON fixture → map_* → assert on the normalized posts.
//! No network.

use chrono::{TimeZone, Utc};
use socialfeed_common::{MediaType, Platform, PostKey};
use socialfeed_providers::providers::mapping::*;

fn fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("{path}: {e}"))
}

// ---------------------------------------------------------------------------
// Instagram
// ---------------------------------------------------------------------------

#[test]
fn instagram_carousel_expands_children_in_order() {
    let posts = map_instagram_media(fixture::<InstagramMediaPage>("instagram_media.json"));
    assert_eq!(posts.len(), 2);

    let carousel = &posts[0];
    let kinds: Vec<_> = carousel.media.iter().map(|m| m.media_type).collect();
    assert_eq!(
        kinds,
        vec![
            MediaType::Image,
            MediaType::Video,
            MediaType::Image,
            MediaType::Image
        ]
    );
    assert_eq!(
        carousel.media[2].remote_url,
        "https://scontent.cdninstagram.com/v/two_thumb.jpg"
    );
    assert_eq!(
        carousel.media[3].remote_url,
        "https://scontent.cdninstagram.com/v/three.jpg"
    );
}

#[test]
fn instagram_metadata_is_mapped() {
    let posts = map_instagram_media(fixture::<InstagramMediaPage>("instagram_media.json"));
    let post = &posts[0];

    assert_eq!(post.platform, Platform::Instagram);
    assert_eq!(post.id, PostKey::fingerprint(Platform::Instagram, "17900000000000001"));
    assert_eq!(post.url.as_deref(), Some("https://www.instagram.com/p/C1aBcDeF/"));
    assert_eq!(post.published_at, Utc.with_ymd_and_hms(2024, 5, 1, 6, 12, 0).unwrap());
    assert_eq!(post.like_count, 128);
    assert_eq!(post.comment_count, 9);
    assert_eq!(post.share_count, 0);
    assert_eq!(post.hashtags, vec!["sunrise", "Harbour"]);
    assert_eq!(post.mentions, vec!["portauthority"]);
}

#[test]
fn instagram_post_without_metrics_defaults_to_zero() {
    let posts = map_instagram_media(fixture::<InstagramMediaPage>("instagram_media.json"));
    let plain = &posts[1];
    assert_eq!(plain.like_count, 0);
    assert!(plain.hashtags.is_empty());
    assert_eq!(plain.media.len(), 1);
}

// ---------------------------------------------------------------------------
// Facebook
// ---------------------------------------------------------------------------

#[test]
fn facebook_album_uses_subattachments() {
    let posts = map_facebook_feed(fixture::<FacebookFeed>("facebook_feed.json"));
    let media = &posts[0].media;

    assert_eq!(media.len(), 2);
    assert_eq!(media[0].media_type, MediaType::Image);
    assert_eq!(media[0].remote_url, "https://scontent.xx.fbcdn.net/a.jpg");
    assert_eq!(media[1].media_type, MediaType::Video);
    assert_eq!(media[1].remote_url, "https://video.xx.fbcdn.net/b.mp4");
}

#[test]
fn facebook_counts_and_text() {
    let posts = map_facebook_feed(fixture::<FacebookFeed>("facebook_feed.json"));
    let post = &posts[0];

    assert_eq!(post.like_count, 54);
    assert_eq!(post.comment_count, 3);
    assert_eq!(post.share_count, 7);
    assert_eq!(post.hashtags, vec!["OpenDay", "community"]);
    assert_eq!(post.mentions, vec!["cityhall"]);
}

#[test]
fn facebook_post_without_message_or_attachments() {
    let posts = map_facebook_feed(fixture::<FacebookFeed>("facebook_feed.json"));
    let bare = &posts[1];
    assert_eq!(bare.content, "");
    assert!(bare.media.is_empty());
    assert!(bare.url.is_none());
}

// ---------------------------------------------------------------------------
// LinkedIn
// ---------------------------------------------------------------------------

#[test]
fn linkedin_post_is_mapped() {
    let posts = map_linkedin_posts(fixture::<LinkedinPostsPage>("linkedin_posts.json"));
    assert_eq!(posts.len(), 1);
    let post = &posts[0];

    assert_eq!(post.external_id, "urn:li:share:7190000000000000001");
    assert_eq!(
        post.url.as_deref(),
        Some("https://www.linkedin.com/feed/update/urn:li:share:7190000000000000001")
    );
    assert_eq!(post.published_at, Utc.timestamp_millis_opt(1_714_557_600_000).unwrap());
    assert_eq!((post.like_count, post.comment_count, post.share_count), (41, 5, 2));
    assert_eq!(post.hashtags, vec!["Hiring", "rust"]);
    assert_eq!(post.mentions, vec!["Jane Doe"]);

    let kinds: Vec<_> = post.media.iter().map(|m| m.media_type).collect();
    assert_eq!(kinds, vec![MediaType::Image, MediaType::Video]);
}

#[test]
fn linkedin_page_without_elements_is_empty() {
    let page: LinkedinPostsPage = serde_json::from_str(r#"{"paging":{}}"#).unwrap();
    assert!(map_linkedin_posts(page).is_empty());
}

// ---------------------------------------------------------------------------
// Twitter
// ---------------------------------------------------------------------------

#[test]
fn twitter_media_follows_attachment_key_order() {
    let posts = map_twitter_search(fixture::<TwitterSearchResponse>("twitter_search.json"));
    let media = &posts[0].media;

    // includes.media lists the video first; attachment order wins.
    assert_eq!(media.len(), 2);
    assert_eq!(media[0].media_type, MediaType::Image);
    assert_eq!(media[0].remote_url, "https://pbs.twimg.com/media/1.jpg");
    assert_eq!(media[1].media_type, MediaType::Video);
    assert_eq!(
        media[1].remote_url,
        "https://pbs.twimg.com/ext_tw_video_thumb/2.jpg"
    );
}

#[test]
fn twitter_entities_and_metrics() {
    let posts = map_twitter_search(fixture::<TwitterSearchResponse>("twitter_search.json"));
    let tweet = &posts[0];

    assert_eq!(tweet.hashtags, vec!["release", "Rust"]);
    assert_eq!(tweet.mentions, vec!["rustlang"]);
    assert_eq!(tweet.like_count, 99);
    assert_eq!(tweet.share_count, 12);
    assert_eq!(tweet.comment_count, 4);
    assert_eq!(
        tweet.published_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap()
    );
}

#[test]
fn twitter_url_uses_author_username_when_known() {
    let posts = map_twitter_search(fixture::<TwitterSearchResponse>("twitter_search.json"));

    assert_eq!(
        posts[0].url.as_deref(),
        Some("https://twitter.com/exampledev/status/1785000000000000001")
    );
    // author 999 is not in includes.users
    assert_eq!(
        posts[1].url.as_deref(),
        Some("https://twitter.com/i/web/status/1785000000000000002")
    );
}

// ---------------------------------------------------------------------------
// Cross-platform
// ---------------------------------------------------------------------------

#[test]
fn fingerprints_are_stable_across_remaps() {
    let first = map_twitter_search(fixture::<TwitterSearchResponse>("twitter_search.json"));
    let second = map_twitter_search(fixture::<TwitterSearchResponse>("twitter_search.json"));
    let a: Vec<_> = first.iter().map(|p| p.id.clone()).collect();
    let b: Vec<_> = second.iter().map(|p| p.id.clone()).collect();
    assert_eq!(a, b);
}
