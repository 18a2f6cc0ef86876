// Media download: fetch each attachment of a post to local disk.
// A failed attachment is logged and left without a local path; the post
// itself is never failed by a download.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use sha2::{Digest, Sha256};
use socialfeed_common::{MediaItem, Post};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::DownloadError;

#[derive(Clone)]
pub struct MediaDownloader {
    client: reqwest::Client,
}

impl MediaDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download every attachment of `post` into `target_dir` concurrently.
    /// Returns the post's media in the original order, with `local_path` set
    /// on the items that were written successfully.
    pub async fn download_post_media(&self, post: &Post, target_dir: &Path) -> Vec<MediaItem> {
        let downloads = post.media.iter().enumerate().map(|(index, item)| {
            let target = target_dir.join(media_filename(post, index, item));
            async move {
                let mut item = item.clone();
                match self.download_file(&item.remote_url, &target).await {
                    Ok(()) => {
                        debug!(path = %target.display(), "Downloaded media");
                        item.local_path = Some(target);
                    }
                    Err(e) => {
                        warn!(
                            platform = %post.platform,
                            external_id = %post.external_id,
                            url = %item.remote_url,
                            error = %e,
                            "Media download failed"
                        );
                    }
                }
                item
            }
        });

        join_all(downloads).await
    }

    /// Stream `url` to `target_path`. Succeeds only on HTTP 200. The body is
    /// written to a sibling `.part` file and renamed into place, so a failed
    /// transfer never leaves a truncated file at `target_path`.
    pub async fn download_file(&self, url: &str, target_path: &Path) -> Result<(), DownloadError> {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut resp = self.client.get(url).send().await?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(DownloadError::Status(resp.status().as_u16()));
        }

        let partial = partial_path(target_path);
        let result = async {
            let mut file = fs::File::create(&partial).await?;
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            fs::rename(&partial, target_path).await?;
            Ok::<(), DownloadError>(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&partial).await;
        }
        result
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Deterministic file name for the `index`-th attachment of a post:
/// `{platform}_{external_id}_{id_hash}_{YYYYMMDD}_{index}.{ext}`.
///
/// `id_hash` is taken from the raw external id, so two ids that sanitize to
/// the same component still get distinct names.
pub fn media_filename(post: &Post, index: usize, item: &MediaItem) -> String {
    let extension = extension_from_url(&item.remote_url)
        .unwrap_or_else(|| item.media_type.default_extension().to_string());
    format!(
        "{}_{}_{}_{}_{}.{}",
        post.platform,
        sanitize_component(&post.external_id),
        id_hash(&post.external_id),
        post.published_at.format("%Y%m%d"),
        index,
        extension
    )
}

fn id_hash(external_id: &str) -> String {
    let digest = Sha256::digest(external_id.as_bytes());
    hex::encode(&digest[..4])
}

/// File extension of the URL path, ignoring query string and fragment.
pub fn extension_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let last = parsed.path_segments()?.last()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    let valid = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}
