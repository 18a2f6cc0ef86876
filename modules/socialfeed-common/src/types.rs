use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// --- Platform ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Instagram,
    Facebook,
    Linkedin,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Linkedin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0} (expected one of twitter, instagram, facebook, linkedin)")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "linkedin" => Ok(Platform::Linkedin),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

// --- Identity ---

/// Storage key of a post. Derived from `(platform, external_id)` so that
/// re-importing the same item always targets the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostKey(String);

impl PostKey {
    /// SHA-256 over `"{platform}_{external_id}"`, hex encoded.
    pub fn fingerprint(platform: Platform, external_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(platform.as_str().as_bytes());
        hasher.update(b"_");
        hasher.update(external_id.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap a key read back from storage.
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the asset store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub i64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Media ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// File extension used when the remote URL doesn't carry one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaType::Image => "jpg",
            MediaType::Video => "mp4",
        }
    }
}

/// One attachment of a post.
///
/// Created with only `remote_url` during fetch. `local_path` is filled in by
/// the download step and `asset_id` once the file is registered as an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub media_type: MediaType,
    pub remote_url: String,
    pub local_path: Option<PathBuf>,
    pub asset_id: Option<AssetId>,
}

impl MediaItem {
    pub fn new(media_type: MediaType, remote_url: impl Into<String>) -> Self {
        Self {
            media_type,
            remote_url: remote_url.into(),
            local_path: None,
            asset_id: None,
        }
    }
}

// --- Post ---

/// A normalized post from any of the supported platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostKey,
    pub platform: Platform,
    pub external_id: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub url: Option<String>,
    /// Attachment order as delivered by the platform.
    pub media: Vec<MediaItem>,
    pub like_count: u64,
    pub share_count: u64,
    pub comment_count: u64,
    /// Insertion-ordered, duplicate-free. Stored without the leading `#`.
    pub hashtags: Vec<String>,
    /// Insertion-ordered, duplicate-free. Stored without the leading `@`.
    pub mentions: Vec<String>,
}

impl Post {
    pub fn new(platform: Platform, external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            id: PostKey::fingerprint(platform, &external_id),
            platform,
            external_id,
            content: String::new(),
            published_at: Utc::now(),
            url: None,
            media: Vec::new(),
            like_count: 0,
            share_count: 0,
            comment_count: 0,
            hashtags: Vec::new(),
            mentions: Vec::new(),
        }
    }

    pub fn add_media(&mut self, media_type: MediaType, remote_url: impl Into<String>) {
        self.media.push(MediaItem::new(media_type, remote_url));
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn first_media_url(&self) -> Option<&str> {
        self.media.first().map(|m| m.remote_url.as_str())
    }

    pub fn first_media_local_path(&self) -> Option<&PathBuf> {
        self.media.first().and_then(|m| m.local_path.as_ref())
    }

    pub fn add_hashtag(&mut self, tag: impl Into<String>) {
        push_unique(&mut self.hashtags, tag.into().trim_start_matches('#'));
    }

    pub fn add_mention(&mut self, handle: impl Into<String>) {
        push_unique(&mut self.mentions, handle.into().trim_start_matches('@'));
    }

    /// Asset ids of every registered attachment, in attachment order.
    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.media.iter().filter_map(|m| m.asset_id).collect()
    }
}

fn push_unique(set: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !set.iter().any(|v| v == value) {
        set.push(value.to_string());
    }
}
