use std::env;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::types::{ImageStore, ImageStoreError, UploadedImage};

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Account settings for Cloudinary
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    /// Cloud (account) name
    pub cloud_name: String,
    /// Public API key
    pub api_key: String,
    /// Secret used to sign requests
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// Reads `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET`.
    pub fn from_env() -> Result<Self, ImageStoreError> {
        let read = |name: &str| {
            env::var(name).map_err(|_| {
                ImageStoreError::Config(format!("{} environment variable not set", name))
            })
        };

        Ok(Self {
            cloud_name: read("CLOUDINARY_CLOUD_NAME")?,
            api_key: read("CLOUDINARY_API_KEY")?,
            api_secret: read("CLOUDINARY_API_SECRET")?,
        })
    }
}

/// Cloudinary image store using signed upload and destroy calls
pub struct CloudinaryImageStore {
    client: Client,
    config: CloudinaryConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryImageStore {
    /// Create a new Cloudinary client
    pub fn new(config: CloudinaryConfig) -> Result<Self, ImageStoreError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| ImageStoreError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            base_url: CLOUDINARY_API_URL.to_string(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.base_url, self.config.cloud_name, action)
    }

    fn signed_params(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }
}

/// Builds the `key=value&...` string Cloudinary signs, keys in alphabetical order.
pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex SHA-256 request signature.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP {}", status),
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, local_path: &Path) -> Result<UploadedImage, ImageStoreError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| ImageStoreError::Upload(format!("Cannot read upload: {}", e)))?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        debug!("Uploading {} ({} bytes) to Cloudinary", file_name, bytes.len());

        let params = self.signed_params(vec![("timestamp", Utc::now().timestamp().to_string())]);
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageStoreError::Upload(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ImageStoreError::Upload(error_message(response).await));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageStoreError::Upload(format!("Failed to parse response: {}", e)))?;

        info!("Uploaded image {}", body.public_id);

        Ok(UploadedImage {
            url: body.secure_url,
            deletion_handle: body.public_id,
        })
    }

    async fn delete(&self, deletion_handle: &str) -> Result<(), ImageStoreError> {
        let params = self.signed_params(vec![
            ("public_id", deletion_handle.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ImageStoreError::Delete(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ImageStoreError::Delete(error_message(response).await));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageStoreError::Delete(format!("Failed to parse response: {}", e)))?;

        match body.result.as_str() {
            "ok" => {
                info!("Deleted image {}", deletion_handle);
                Ok(())
            }
            // already gone
            "not found" => {
                warn!("Image {} was already deleted", deletion_handle);
                Ok(())
            }
            other => Err(ImageStoreError::Delete(format!("Unexpected result: {}", other))),
        }
    }
}

/// Mock image store for development/testing
pub struct MockImageStore;

#[async_trait]
impl ImageStore for MockImageStore {
    async fn upload(&self, local_path: &Path) -> Result<UploadedImage, ImageStoreError> {
        let handle = format!("mock-image-{}", uuid::Uuid::new_v4());
        info!("🖼️ [MOCK IMAGE] Uploading {} as {}", local_path.display(), handle);

        Ok(UploadedImage {
            url: format!("https://images.invalid/{}", handle),
            deletion_handle: handle,
        })
    }

    async fn delete(&self, deletion_handle: &str) -> Result<(), ImageStoreError> {
        info!("🖼️ [MOCK IMAGE] Deleting {}", deletion_handle);
        Ok(())
    }
}
