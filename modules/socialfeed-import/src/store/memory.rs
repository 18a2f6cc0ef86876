// In-memory implementation of all three stores. Used when no DATABASE_URL is
// configured and as the stateful store in tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use socialfeed_common::{AssetId, Platform, Post, PostKey};

use super::{Asset, AssetStore, ElementType, PostStore, StoreResult, Tag, TagService};

#[derive(Default)]
struct State {
    posts: HashMap<PostKey, StoredPost>,
    folders: BTreeSet<String>,
    assets: BTreeMap<AssetId, Asset>,
    asset_bytes: HashMap<AssetId, Vec<u8>>,
    tags: Vec<Tag>,
    assignments: HashSet<(ElementType, String, i64)>,
    inserts: usize,
    updates: usize,
}

#[derive(Debug, Clone)]
struct StoredPost {
    folder: String,
    post: Post,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All stored posts, ordered by platform then external id.
    pub fn posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.state().posts.values().map(|s| s.post.clone()).collect();
        posts.sort_by(|a, b| {
            (a.platform, a.external_id.as_str()).cmp(&(b.platform, b.external_id.as_str()))
        });
        posts
    }

    pub fn post(&self, key: &PostKey) -> Option<Post> {
        self.state().posts.get(key).map(|s| s.post.clone())
    }

    pub fn folder_of(&self, key: &PostKey) -> Option<String> {
        self.state().posts.get(key).map(|s| s.folder.clone())
    }

    pub fn posts_for(&self, platform: Platform) -> usize {
        self.state()
            .posts
            .values()
            .filter(|s| s.post.platform == platform)
            .count()
    }

    pub fn folders(&self) -> Vec<String> {
        self.state().folders.iter().cloned().collect()
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.state().assets.values().cloned().collect()
    }

    pub fn asset_bytes(&self, id: AssetId) -> Option<Vec<u8>> {
        self.state().asset_bytes.get(&id).cloned()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.state().tags.clone()
    }

    /// `(inserts, updates)` performed by `upsert` so far.
    pub fn write_counts(&self) -> (usize, usize) {
        let state = self.state();
        (state.inserts, state.updates)
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn find_by_external_id(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> StoreResult<Option<Post>> {
        Ok(self
            .state()
            .posts
            .values()
            .find(|s| s.post.platform == platform && s.post.external_id == external_id)
            .map(|s| s.post.clone()))
    }

    async fn upsert(&self, folder: &str, post: &Post) -> StoreResult<()> {
        let mut state = self.state();
        let stored = StoredPost {
            folder: folder.to_string(),
            post: post.clone(),
        };
        if state.posts.insert(post.id.clone(), stored).is_some() {
            state.updates += 1;
        } else {
            state.inserts += 1;
        }
        Ok(())
    }

    async fn create_folder_if_missing(&self, path: &str) -> StoreResult<()> {
        self.state().folders.insert(path.to_string());
        Ok(())
    }

    async fn count_posts(&self) -> StoreResult<usize> {
        Ok(self.state().posts.len())
    }
}

#[async_trait]
impl AssetStore for InMemoryStore {
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Asset>> {
        Ok(self
            .state()
            .assets
            .values()
            .find(|a| a.path == path)
            .cloned())
    }

    async fn create_from_bytes(&self, path: &str, bytes: Vec<u8>) -> StoreResult<AssetId> {
        let mut state = self.state();
        let id = AssetId(state.assets.len() as i64 + 1);
        state.assets.insert(
            id,
            Asset {
                id,
                path: path.to_string(),
                size: bytes.len() as u64,
            },
        );
        state.asset_bytes.insert(id, bytes);
        Ok(id)
    }
}

#[async_trait]
impl TagService for InMemoryStore {
    async fn get_or_create_tag(&self, name: &str, parent: Option<&Tag>) -> StoreResult<Tag> {
        let parent_id = parent.map(|p| p.id);
        let mut state = self.state();
        if let Some(tag) = state
            .tags
            .iter()
            .find(|t| t.name == name && t.parent_id == parent_id)
        {
            return Ok(tag.clone());
        }

        let tag = Tag {
            id: state.tags.len() as i64 + 1,
            name: name.to_string(),
            parent_id,
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn assign_tag(
        &self,
        element_type: ElementType,
        element_id: &str,
        tag: &Tag,
    ) -> StoreResult<()> {
        self.state()
            .assignments
            .insert((element_type, element_id.to_string(), tag.id));
        Ok(())
    }

    async fn tags_for(&self, element_type: ElementType, element_id: &str) -> StoreResult<Vec<Tag>> {
        let state = self.state();
        Ok(state
            .tags
            .iter()
            .filter(|t| {
                state
                    .assignments
                    .contains(&(element_type, element_id.to_string(), t.id))
            })
            .cloned()
            .collect())
    }
}
