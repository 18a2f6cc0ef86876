// Storage seams consumed by the import pipeline. The orchestrator only ever
// talks to these traits; `memory` backs tests and database-less runs,
// `postgres` backs production.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use socialfeed_common::{AssetId, Platform, Post};

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A stored binary media object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Full asset path, `{assets_folder}/{filename}`.
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Kind of element a tag is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Post,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Post => "post",
        }
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Existing post for `(platform, external_id)`, if any.
    async fn find_by_external_id(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> StoreResult<Option<Post>>;

    /// Insert the post under `post.id`, or overwrite every mutable field of
    /// the record already stored under that key. Media relations are
    /// replaced by `post.asset_ids()`.
    async fn upsert(&self, folder: &str, post: &Post) -> StoreResult<()>;

    async fn create_folder_if_missing(&self, path: &str) -> StoreResult<()>;

    async fn count_posts(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Asset>>;

    async fn create_from_bytes(&self, path: &str, bytes: Vec<u8>) -> StoreResult<AssetId>;
}

#[async_trait]
pub trait TagService: Send + Sync {
    /// Tag named `name` under `parent` (or at the root), created on first use.
    async fn get_or_create_tag(&self, name: &str, parent: Option<&Tag>) -> StoreResult<Tag>;

    /// Attach `tag` to an element. Assigning the same tag twice is a no-op.
    async fn assign_tag(
        &self,
        element_type: ElementType,
        element_id: &str,
        tag: &Tag,
    ) -> StoreResult<()>;

    async fn tags_for(&self, element_type: ElementType, element_id: &str) -> StoreResult<Vec<Tag>>;
}

