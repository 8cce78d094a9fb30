//! Reference asset management
//!
//! Collects the reference images of one composition, validates them, and turns
//! pending local files into durable URLs before any job is submitted.

pub mod data_url;
pub mod local;
pub mod manager;

pub use local::{detect_image_format, LocalAssetStore};
pub use manager::{ReferenceAssetManager, ResolvedReferences, RetryPolicy};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::Result;

/// Provider parameter carrying a single reference image
pub const SINGLE_REFERENCE_PARAM: &str = "image_url";

/// Provider parameter carrying a list of reference images
pub const MULTI_REFERENCE_PARAM: &str = "image_urls";

/// A user-supplied file that has not been uploaded yet
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAsset {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl LocalAsset {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared content type, or one sniffed from the file's magic bytes
    pub fn effective_content_type(&self) -> Option<&str> {
        match self.content_type.as_deref() {
            Some(declared) if !declared.is_empty() => Some(declared),
            _ => detect_image_format(&self.bytes).map(|(_, mime)| mime),
        }
    }
}

/// One reference image: already hosted, or waiting for upload
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceItem {
    Hosted(String),
    Pending(LocalAsset),
}

impl ReferenceItem {
    pub fn is_pending(&self) -> bool {
        matches!(self, ReferenceItem::Pending(_))
    }
}

/// Why a single file was refused
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AssetRejection {
    #[error("File \"{file_name}\" is not an image. Only image uploads are allowed.")]
    NotAnImage { file_name: String },

    #[error("File \"{file_name}\" is too large. Maximum size is {max_mb}MB.")]
    TooLarge { file_name: String, max_mb: u64 },
}

/// Validate one file against the type and size rules
pub fn validate(asset: &LocalAsset, max_bytes: u64) -> std::result::Result<(), AssetRejection> {
    let is_image = asset
        .effective_content_type()
        .map(|mime| mime.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(AssetRejection::NotAnImage {
            file_name: asset.file_name.clone(),
        });
    }

    if asset.size() > max_bytes {
        return Err(AssetRejection::TooLarge {
            file_name: asset.file_name.clone(),
            max_mb: max_bytes / (1024 * 1024),
        });
    }

    Ok(())
}

/// The reference images attached to one composition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    single: Option<ReferenceItem>,
    multiple: Vec<ReferenceItem>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add files, keeping every valid one. Models without a multi-reference slot
    /// take only the first valid file into the single slot.
    pub fn add_files(&mut self, files: Vec<LocalAsset>, multi: bool, max_bytes: u64) -> Vec<AssetRejection> {
        let mut rejections = Vec::new();
        let mut accepted = Vec::new();

        for file in files {
            match validate(&file, max_bytes) {
                Ok(()) => accepted.push(ReferenceItem::Pending(file)),
                Err(rejection) => rejections.push(rejection),
            }
        }

        if multi {
            self.multiple.extend(accepted);
        } else if let Some(first) = accepted.into_iter().next() {
            self.single = Some(first);
        }

        rejections
    }

    /// Attach an already-hosted image
    pub fn add_url(&mut self, url: impl Into<String>, multi: bool) {
        let item = ReferenceItem::Hosted(url.into());
        if multi {
            self.multiple.push(item);
        } else {
            self.single = Some(item);
        }
    }

    /// Remove by position in `items()`
    pub fn remove(&mut self, index: usize) -> Option<ReferenceItem> {
        if !self.multiple.is_empty() {
            if index < self.multiple.len() {
                return Some(self.multiple.remove(index));
            }
            return None;
        }
        if index == 0 {
            return self.single.take();
        }
        None
    }

    /// The visible references: the multi slot when populated, otherwise the single slot
    pub fn items(&self) -> Vec<&ReferenceItem> {
        if !self.multiple.is_empty() {
            self.multiple.iter().collect()
        } else {
            self.single.iter().collect()
        }
    }

    pub fn single(&self) -> Option<&ReferenceItem> {
        self.single.as_ref()
    }

    pub fn multiple(&self) -> &[ReferenceItem] {
        &self.multiple
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_none() && self.multiple.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.single.iter().chain(self.multiple.iter()).any(ReferenceItem::is_pending)
    }
}

/// External storage that turns a local file into a durable URL
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, asset: &LocalAsset) -> Result<String>;
}
