//! Media host client for post images
//!
//! Uploads go to an unsigned-preset endpoint as multipart form data
//! (`file`, `upload_preset`); the response carries the public `secure_url`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::MediaConfig;
use crate::error::{SyncError, SyncResult};

/// Binary upload collaborator
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload `bytes` and return the stable public URL
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> SyncResult<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// HTTP implementation of [`MediaHost`]
pub struct HttpMediaHost {
    upload_url: String,
    upload_preset: String,
    http_client: Client,
}

impl HttpMediaHost {
    pub fn from_config(cfg: &MediaConfig) -> SyncResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {e}")))?;

        info!(upload_url = %cfg.upload_url, "Media host client initialized");

        Ok(Self {
            upload_url: cfg.upload_url.clone(),
            upload_preset: cfg.upload_preset.clone(),
            http_client,
        })
    }

    fn form(&self, bytes: Vec<u8>, filename: &str) -> Form {
        Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("upload_preset", self.upload_preset.clone())
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> SyncResult<String> {
        let size = bytes.len();
        let response = self
            .http_client
            .post(&self.upload_url)
            .multipart(self.form(bytes, filename))
            .send()
            .await
            .map_err(|e| {
                error!(filename = %filename, error = %e, "Media upload request failed");
                SyncError::UploadError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(filename = %filename, status = %status, body = %body, "Media host rejected upload");
            return Err(SyncError::UploadError(format!(
                "media host returned {}",
                status
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| SyncError::UploadError(format!("invalid upload response: {e}")))?;

        info!(filename = %filename, size, url = %parsed.secure_url, "Media uploaded");
        Ok(parsed.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MediaConfig {
        MediaConfig {
            upload_url: "https://media.example/v1/upload".to_string(),
            upload_preset: "konnekt_unsigned".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_from_config() {
        let host = HttpMediaHost::from_config(&config()).unwrap();
        assert_eq!(host.upload_preset, "konnekt_unsigned");
        assert!(!host.form(vec![1, 2, 3], "a.png").boundary().is_empty());
    }

    #[test]
    fn test_upload_response_shape() {
        let parsed: UploadResponse =
            serde_json::from_str(r#"{"secure_url":"https://cdn.example/a.png","bytes":3}"#)
                .unwrap();
        assert_eq!(parsed.secure_url, "https://cdn.example/a.png");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upload_error() {
        let host = HttpMediaHost::from_config(&MediaConfig {
            upload_url: "http://127.0.0.1:9/upload".to_string(),
            ..config()
        })
        .unwrap();

        let err = host.upload(vec![0u8; 4], "a.png").await.unwrap_err();
        assert!(matches!(err, SyncError::UploadError(_)));
    }
}
