//! Disk-backed asset storage for self-hosted deployments

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::assets::{AssetUploader, LocalAsset};
use crate::error::Result;

/// Stores reference assets on disk and serves them under a URL prefix
pub struct LocalAssetStore {
    storage_path: PathBuf,
    url_prefix: String,
}

impl LocalAssetStore {
    pub fn new(storage_path: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn storage_path(&self) -> &PathBuf {
        &self.storage_path
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created asset storage directory");
        }
        Ok(())
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), filename)
    }
}

#[async_trait]
impl AssetUploader for LocalAssetStore {
    async fn upload(&self, asset: &LocalAsset) -> Result<String> {
        self.ensure_storage_dir().await?;

        let extension = detect_image_format(&asset.bytes)
            .map(|(ext, _)| ext)
            .unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.storage_path.join(&filename);

        fs::write(&file_path, &asset.bytes).await?;

        debug!(path = ?file_path, size = asset.bytes.len(), "Stored reference asset");
        Ok(self.url_for(&filename))
    }
}

/// Detect image format from magic bytes, returning (extension, MIME type)
pub fn detect_image_format(data: &[u8]) -> Option<(&'static str, &'static str)> {
    if data.len() < 8 {
        return None;
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(("png", "image/png"));
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(("jpg", "image/jpeg"));
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(("gif", "image/gif"));
    }

    // RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some(("webp", "image/webp"));
    }

    if data.starts_with(b"BM") {
        return Some(("bmp", "image/bmp"));
    }

    None
}
