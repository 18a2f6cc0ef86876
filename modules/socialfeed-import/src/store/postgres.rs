//! Postgres-backed stores.
//!
//! Posts live in `social_posts` keyed by their fingerprint, with the full
//! media list kept as JSONB and the ordered asset relations in
//! `social_post_assets`. Asset bytes are stored inline in `assets`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use socialfeed_common::{AssetId, MediaItem, Platform, Post, PostKey};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use super::{Asset, AssetStore, ElementType, PostStore, StoreResult, Tag, TagService};
use crate::error::StoreError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        info!("Connected to Postgres, migrations complete");
        Ok(store)
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    post_key: String,
    platform: String,
    external_id: String,
    content: String,
    published_at: DateTime<Utc>,
    url: Option<String>,
    like_count: i64,
    share_count: i64,
    comment_count: i64,
    hashtags: Vec<String>,
    mentions: Vec<String>,
    media: Json<Vec<MediaItem>>,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let platform: Platform = row
            .platform
            .parse()
            .map_err(|e| StoreError::Other(format!("stored post {}: {e}", row.post_key)))?;

        Ok(Post {
            id: PostKey::from_stored(row.post_key),
            platform,
            external_id: row.external_id,
            content: row.content,
            published_at: row.published_at,
            url: row.url,
            media: row.media.0,
            like_count: row.like_count.max(0) as u64,
            share_count: row.share_count.max(0) as u64,
            comment_count: row.comment_count.max(0) as u64,
            hashtags: row.hashtags,
            mentions: row.mentions,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: i64,
    path: String,
    size: i64,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Asset {
            id: AssetId(row.id),
            path: row.path,
            size: row.size.max(0) as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
    parent_id: Option<i64>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
        }
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl PostStore for PgStore {
    async fn find_by_external_id(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT post_key, platform, external_id, content, published_at, url,
                   like_count, share_count, comment_count, hashtags, mentions, media
            FROM social_posts
            WHERE platform = $1 AND external_id = $2
            "#,
        )
        .bind(platform.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::try_from).transpose()
    }

    async fn upsert(&self, folder: &str, post: &Post) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO social_posts (
                post_key, platform, external_id, folder, content, published_at, url,
                like_count, share_count, comment_count, hashtags, mentions, media
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (post_key) DO UPDATE SET
                folder        = EXCLUDED.folder,
                content       = EXCLUDED.content,
                published_at  = EXCLUDED.published_at,
                url           = EXCLUDED.url,
                like_count    = EXCLUDED.like_count,
                share_count   = EXCLUDED.share_count,
                comment_count = EXCLUDED.comment_count,
                hashtags      = EXCLUDED.hashtags,
                mentions      = EXCLUDED.mentions,
                media         = EXCLUDED.media,
                updated_at    = now()
            "#,
        )
        .bind(post.id.as_str())
        .bind(post.platform.as_str())
        .bind(&post.external_id)
        .bind(folder)
        .bind(&post.content)
        .bind(post.published_at)
        .bind(&post.url)
        .bind(clamp_i64(post.like_count))
        .bind(clamp_i64(post.share_count))
        .bind(clamp_i64(post.comment_count))
        .bind(&post.hashtags)
        .bind(&post.mentions)
        .bind(Json(&post.media))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM social_post_assets WHERE post_key = $1")
            .bind(post.id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, asset_id) in post.asset_ids().into_iter().enumerate() {
            sqlx::query(
                "INSERT INTO social_post_assets (post_key, position, asset_id) VALUES ($1, $2, $3)",
            )
            .bind(post.id.as_str())
            .bind(position as i32)
            .bind(asset_id.0)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_folder_if_missing(&self, path: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO folders (path) VALUES ($1) ON CONFLICT (path) DO NOTHING")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_posts(&self) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM social_posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl AssetStore for PgStore {
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Asset>> {
        let row = sqlx::query_as::<_, AssetRow>("SELECT id, path, size FROM assets WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Asset::from))
    }

    async fn create_from_bytes(&self, path: &str, bytes: Vec<u8>) -> StoreResult<AssetId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO assets (path, size, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (path) DO UPDATE SET size = EXCLUDED.size, data = EXCLUDED.data
            RETURNING id
            "#,
        )
        .bind(path)
        .bind(bytes.len() as i64)
        .bind(bytes)
        .fetch_one(&self.pool)
        .await?;
        Ok(AssetId(id))
    }
}

impl PgStore {
    async fn find_tag(&self, name: &str, parent_id: Option<i64>) -> StoreResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, parent_id FROM tags WHERE name = $1 AND parent_id IS NOT DISTINCT FROM $2",
        )
        .bind(name)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tag::from))
    }
}

#[async_trait]
impl TagService for PgStore {
    async fn get_or_create_tag(&self, name: &str, parent: Option<&Tag>) -> StoreResult<Tag> {
        let parent_id = parent.map(|p| p.id);
        if let Some(tag) = self.find_tag(name, parent_id).await? {
            return Ok(tag);
        }

        let inserted = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (name, parent_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING id, name, parent_id
            "#,
        )
        .bind(name)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row.into()),
            // Lost a race with a concurrent insert.
            None => self
                .find_tag(name, parent_id)
                .await?
                .ok_or_else(|| StoreError::Other(format!("tag {name} vanished after conflict"))),
        }
    }

    async fn assign_tag(
        &self,
        element_type: ElementType,
        element_id: &str,
        tag: &Tag,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tag_assignments (element_type, element_id, tag_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(element_type.as_str())
        .bind(element_id)
        .bind(tag.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tags_for(&self, element_type: ElementType, element_id: &str) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name, t.parent_id
            FROM tags t
            JOIN tag_assignments a ON a.tag_id = t.id
            WHERE a.element_type = $1 AND a.element_id = $2
            ORDER BY t.id
            "#,
        )
        .bind(element_type.as_str())
        .bind(element_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }
}
