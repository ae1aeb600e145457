//! Media Upload Collaborator
//!
//! Trait seam over the remote media host plus the multipart spooling
//! helpers. `upload` signals failure with `None` so callers decide which
//! uploads are fatal; the spooled file is removed on success and on
//! failure alike.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::extract::multipart::Field;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;

/// Allowed MIME types for avatar and cover uploads
const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Max file size: 10MB
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub url: String,
}

/// Port for the remote media host.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload a spooled file. Returns `None` on any failure. The spooled
    /// file no longer exists once this returns.
    async fn upload(&self, file_path: &Path) -> Option<UploadedAsset>;
}

#[derive(Debug, thiserror::Error)]
enum UploadFailure {
    #[error("failed to read spooled file: {0}")]
    Read(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("media host returned status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    url: String,
}

/// HTTP client for the configured media host
pub struct RemoteMediaHost {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

impl RemoteMediaHost {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: config.media_upload_url.clone(),
            api_key: config.media_api_key.clone(),
            api_secret: config.media_api_secret.clone(),
        }
    }

    async fn send(&self, file_path: &Path) -> Result<UploadedAsset, UploadFailure> {
        let bytes = tokio::fs::read(file_path).await?;

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadFailure::Status(response.status()));
        }

        let reply: UploadReply = response.json().await?;
        Ok(UploadedAsset { url: reply.url })
    }
}

#[async_trait]
impl MediaHost for RemoteMediaHost {
    async fn upload(&self, file_path: &Path) -> Option<UploadedAsset> {
        let result = self.send(file_path).await;

        if let Err(err) = tokio::fs::remove_file(file_path).await {
            tracing::debug!(path = %file_path.display(), "Failed to remove spooled file: {}", err);
        }

        match result {
            Ok(asset) => {
                tracing::info!(url = %asset.url, "File uploaded to media host");
                Some(asset)
            }
            Err(err) => {
                tracing::warn!(path = %file_path.display(), "Media upload failed: {}", err);
                None
            }
        }
    }
}

// ============================================
// Multipart Spooling
// ============================================

/// Write one multipart file field to the spool directory.
///
/// Validates content type and size before touching the disk.
pub async fn spool_field(tmp_dir: &Path, field: Field<'_>) -> Result<PathBuf, ApiError> {
    let content_type = field
        .content_type()
        .ok_or_else(|| ApiError::Validation("No content type provided".to_string()))?
        .to_string();

    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "File type '{}' not allowed. Allowed types: {:?}",
            content_type, ALLOWED_TYPES
        )));
    }

    let ext = field
        .file_name()
        .and_then(|name| name.rsplit('.').next())
        .unwrap_or("bin")
        .to_string();

    let data = field.bytes().await?;

    if data.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation(format!(
            "File too large. Max size: {}MB",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    tokio::fs::create_dir_all(tmp_dir)
        .await
        .map_err(|e| ApiError::Upload(format!("Failed to prepare spool directory: {}", e)))?;

    let path = tmp_dir.join(format!("{}.{}", Uuid::new_v4(), ext));
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::Upload(format!("Failed to spool upload: {}", e)))?;

    Ok(path)
}

/// Best-effort cleanup for a spooled file that never reached the host
pub async fn remove_spooled(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), "Failed to remove spooled file: {}", err);
    }
}
