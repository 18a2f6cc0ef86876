// Platform-specific providers. Each one knows how to read one platform's
// feed and map it to the normalized Post. Zero storage dependency.

mod facebook;
mod instagram;
mod linkedin;
mod twitter;

pub use facebook::FacebookProvider;
pub use instagram::InstagramProvider;
pub use linkedin::LinkedinProvider;
pub use twitter::TwitterProvider;

pub mod mapping {
    //! Pure response-to-Post mapping, exposed for fixture tests.
    pub use super::facebook::{map_feed as map_facebook_feed, FacebookFeed};
    pub use super::instagram::{map_media as map_instagram_media, InstagramMediaPage};
    pub use super::linkedin::{map_posts as map_linkedin_posts, LinkedinPostsPage};
    pub use super::twitter::{map_search as map_twitter_search, TwitterSearchResponse};
}

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::provider::MAX_PAGE_SIZE;

pub(crate) fn page_size(limit: u32) -> u32 {
    limit.min(MAX_PAGE_SIZE)
}

/// Parse the timestamp formats the Graph and Twitter APIs emit
/// (`2024-05-01T10:00:00+0000`, RFC 3339). Falls back to now.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    })
    .unwrap_or_else(Utc::now)
}

/// Milliseconds since the Unix epoch, falling back to now.
pub(crate) fn timestamp_from_millis(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// Metric counts arrive as signed JSON numbers; clamp negatives to zero.
pub(crate) fn count(value: Option<i64>) -> u64 {
    value.map(|v| v.max(0) as u64).unwrap_or(0)
}
