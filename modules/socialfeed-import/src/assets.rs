// Asset registration: turns a downloaded file into a managed asset.
// Registration is keyed by `{assets_folder}/{filename}`, so re-importing a
// file that is already registered reuses its id.

use std::path::Path;
use std::sync::Arc;

use socialfeed_common::AssetId;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{AssetStore, StoreResult};

#[derive(Clone)]
pub struct AssetRegistrar {
    store: Arc<dyn AssetStore>,
}

impl AssetRegistrar {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Register `local_path` under `assets_folder`, returning the id of the
    /// existing asset when one is already stored at that path.
    pub async fn register_asset(&self, local_path: &Path, assets_folder: &str) -> StoreResult<AssetId> {
        let path = asset_path(local_path, assets_folder)?;

        if let Some(existing) = self.store.find_by_path(&path).await? {
            debug!(path = %path, asset_id = %existing.id, "Asset already registered");
            return Ok(existing.id);
        }

        let bytes = tokio::fs::read(local_path).await?;
        let id = self.store.create_from_bytes(&path, bytes).await?;
        debug!(path = %path, asset_id = %id, "Registered asset");
        Ok(id)
    }
}

/// `{assets_folder}/{file name of local_path}`.
pub fn asset_path(local_path: &Path, assets_folder: &str) -> StoreResult<String> {
    let filename = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StoreError::InvalidPath(local_path.display().to_string()))?;

    let folder = assets_folder.trim_end_matches('/');
    Ok(format!("{folder}/{filename}"))
}
