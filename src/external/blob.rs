use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::config::BlobConfig;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob store not configured: {0}")]
    NotConfigured(&'static str),

    #[error("blob store rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A file received from a client, held in memory until handed to the store
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the file and return a retrieval URL
    async fn upload(&self, file: UploadedFile) -> Result<String, BlobError>;
}

/// Signed uploads to a Cloudinary-compatible media API
pub struct CloudinaryBlobStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryBlobStore {
    pub fn from_config(config: &BlobConfig) -> Result<Self, BlobError> {
        if config.cloud_name.is_empty() {
            return Err(BlobError::NotConfigured("cloud name"));
        }
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(BlobError::NotConfigured("api credentials"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/v1_1/{}/auto/upload",
                config.base_url.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }
}

/// Sign the upload parameters: sorted `k=v` pairs joined by `&`, secret
/// appended, SHA-256, lowercase hex.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl BlobStore for CloudinaryBlobStore {
    async fn upload(&self, file: UploadedFile) -> Result<String, BlobError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let mut part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        debug!("Uploading {} to blob store", file.file_name);
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            return Err(BlobError::Rejected {
                status: status.as_u16(),
                message: body["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(parsed.secure_url)
    }
}

/// Keeps uploads in process; used by `serve --in-memory` and tests
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    files: Arc<RwLock<Vec<(String, UploadedFile)>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<(String, UploadedFile)> {
        self.files.read().map(|files| files.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: UploadedFile) -> Result<String, BlobError> {
        let url = format!("memory://documents/{}-{}", uuid::Uuid::new_v4(), file.file_name);
        let mut files = self.files.write().map_err(|_| BlobError::Rejected {
            status: 500,
            message: "memory blob store poisoned".into(),
        })?;
        files.push((url.clone(), file));
        Ok(url)
    }
}
