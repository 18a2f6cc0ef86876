//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use socialfeed_common::{MediaType, Platform, Post};
use socialfeed_import::{AssetStore, ElementType, PgStore, PostStore, TagService};
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

/// Tests share one database; each holds this for its whole run.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Get a migrated store on a clean database, or skip if no test DB is available.
async fn test_store() -> Option<(PgStore, MutexGuard<'static, ()>)> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let guard = DB_LOCK.lock().await;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgStore::new(pool);
    store.migrate().await.ok()?;

    sqlx::query(
        "TRUNCATE tag_assignments, tags, social_post_assets, social_posts, assets, folders RESTART IDENTITY CASCADE",
    )
    .execute(store.pool())
    .await
    .ok()?;

    store.create_folder_if_missing("/SocialMediaPosts").await.ok()?;
    Some((store, guard))
}

#[tokio::test]
async fn upsert_round_trips_and_updates_in_place() {
    let Some((store, _guard)) = test_store().await else {
        return;
    };

    let mut post = Post::new(Platform::Instagram, "17900000000000001");
    post.content = "hello #world".to_string();
    post.add_hashtag("world");
    post.add_media(MediaType::Image, "https://cdn.example/a.jpg");
    store.upsert("/SocialMediaPosts", &post).await.unwrap();

    post.like_count = 12;
    post.content = "edited".to_string();
    store.upsert("/SocialMediaPosts", &post).await.unwrap();

    let found = store
        .find_by_external_id(Platform::Instagram, "17900000000000001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, post.id);
    assert_eq!(found.content, "edited");
    assert_eq!(found.like_count, 12);
    assert_eq!(found.hashtags, vec!["world"]);
    assert_eq!(found.media, post.media);
    assert_eq!(store.count_posts().await.unwrap(), 1);
}

#[tokio::test]
async fn asset_relations_are_replaced() {
    let Some((store, _guard)) = test_store().await else {
        return;
    };

    let a = store.create_from_bytes("/SocialMedia/a.jpg", vec![1]).await.unwrap();
    let b = store.create_from_bytes("/SocialMedia/b.jpg", vec![2]).await.unwrap();

    let mut post = Post::new(Platform::Twitter, "1");
    post.add_media(MediaType::Image, "https://x/a.jpg");
    post.add_media(MediaType::Image, "https://x/b.jpg");
    post.media[0].asset_id = Some(a);
    post.media[1].asset_id = Some(b);
    store.upsert("/SocialMediaPosts", &post).await.unwrap();

    post.media.clear();
    store.upsert("/SocialMediaPosts", &post).await.unwrap();

    let relations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM social_post_assets")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(relations, 0);
}

#[tokio::test]
async fn assets_are_found_by_path() {
    let Some((store, _guard)) = test_store().await else {
        return;
    };

    let id = store
        .create_from_bytes("/SocialMedia/photo.jpg", b"bytes".to_vec())
        .await
        .unwrap();
    let found = store.find_by_path("/SocialMedia/photo.jpg").await.unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.size, 5);
    assert!(store.find_by_path("/SocialMedia/other.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn tags_are_get_or_create() {
    let Some((store, _guard)) = test_store().await else {
        return;
    };

    let root = store.get_or_create_tag("Social Media", None).await.unwrap();
    let again = store.get_or_create_tag("Social Media", None).await.unwrap();
    assert_eq!(root, again);

    let child = store.get_or_create_tag("rust", Some(&root)).await.unwrap();
    assert_eq!(child.parent_id, Some(root.id));

    store.assign_tag(ElementType::Post, "k", &root).await.unwrap();
    store.assign_tag(ElementType::Post, "k", &root).await.unwrap();
    store.assign_tag(ElementType::Post, "k", &child).await.unwrap();

    let tags = store.tags_for(ElementType::Post, "k").await.unwrap();
    assert_eq!(tags, vec![root, child]);
}
