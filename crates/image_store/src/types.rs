use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors raised by image store clients.
#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    /// The upload was rejected or could not be sent.
    #[error("Image upload failed: {0}")]
    Upload(String),

    /// The remote image could not be removed.
    #[error("Image delete failed: {0}")]
    Delete(String),

    /// Credentials or settings are missing.
    #[error("Image store configuration error: {0}")]
    Config(String),
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Durable public URL of the image
    pub url: String,
    /// Opaque handle needed to delete the image later
    pub deletion_handle: String,
}

/// A hosted store for listing images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads the file at `local_path`.
    async fn upload(&self, local_path: &Path) -> Result<UploadedImage, ImageStoreError>;

    /// Deletes the image identified by `deletion_handle`.
    async fn delete(&self, deletion_handle: &str) -> Result<(), ImageStoreError>;
}
