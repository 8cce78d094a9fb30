//! Upload-with-retry and reference resolution

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::assets::{AssetUploader, LocalAsset, ReferenceItem, ReferenceSet};
use crate::config::AssetConfig;
use crate::error::{AppError, Result};

/// Linear backoff for transient upload failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before attempt `n` (n >= 2) is `backoff_step * n`
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 1).then(|| self.backoff_step * attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(300),
        }
    }
}

/// Pure-URL snapshot of a composition's references
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedReferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

impl ResolvedReferences {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.image_urls.is_empty()
    }
}

/// Uploads pending reference files through an external store
pub struct ReferenceAssetManager {
    uploader: Arc<dyn AssetUploader>,
    retry: RetryPolicy,
    max_file_bytes: u64,
}

impl ReferenceAssetManager {
    pub fn new(uploader: Arc<dyn AssetUploader>) -> Self {
        Self::with_policy(uploader, RetryPolicy::default(), AssetConfig::default().max_file_bytes)
    }

    pub fn with_policy(uploader: Arc<dyn AssetUploader>, retry: RetryPolicy, max_file_bytes: u64) -> Self {
        Self {
            uploader,
            retry,
            max_file_bytes,
        }
    }

    pub fn from_config(uploader: Arc<dyn AssetUploader>, config: &AssetConfig) -> Self {
        Self::with_policy(
            uploader,
            RetryPolicy {
                max_attempts: config.upload_attempts,
                backoff_step: Duration::from_millis(config.upload_backoff_ms),
            },
            config.max_file_bytes,
        )
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Upload one file, retrying transient failures with linear backoff
    pub async fn upload(&self, asset: &LocalAsset) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            if let Some(delay) = self.retry.delay_before(attempt) {
                tokio::time::sleep(delay).await;
            }

            match self.uploader.upload(asset).await {
                Ok(url) => {
                    debug!(file = %asset.file_name, attempt = attempt, "Reference uploaded");
                    return Ok(url);
                }
                Err(e) => {
                    warn!(file = %asset.file_name, attempt = attempt, error = %e, "Reference upload failed");
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::UploadFailed(match last_error {
            Some(e) => e.to_string(),
            None => format!("no upload attempts made for '{}'", asset.file_name),
        }))
    }

    async fn resolve_item(&self, item: &ReferenceItem) -> Result<Option<String>> {
        match item {
            ReferenceItem::Hosted(url) if url.is_empty() => Ok(None),
            ReferenceItem::Hosted(url) => Ok(Some(url.clone())),
            ReferenceItem::Pending(asset) => self.upload(asset).await.map(Some),
        }
    }

    /// Upload every pending file once and return URLs only.
    /// Any upload failure aborts the whole resolution.
    pub async fn resolve_all(&self, references: &ReferenceSet) -> Result<ResolvedReferences> {
        let mut resolved = ResolvedReferences::default();

        if let Some(item) = references.single() {
            resolved.image_url = self.resolve_item(item).await?;
        }

        for item in references.multiple() {
            if let Some(url) = self.resolve_item(item).await? {
                resolved.image_urls.push(url);
            }
        }

        Ok(resolved)
    }
}
