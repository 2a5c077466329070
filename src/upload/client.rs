use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::UploadError;
use super::validate::CheckedFile;

const UPLOAD_PATH: &str = "/api/upload";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "fileUrl")]
    file_url: Option<String>,
}

/// Client for the file host's `POST /api/upload` endpoint.
pub struct UploadClient {
    http: reqwest::Client,
    origin: String,
}

impl UploadClient {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    /// Send `file` as the multipart field `file`; returns the playable URL.
    pub async fn upload(&self, file: &CheckedFile) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(&file.path).await?;
        let part = Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(file.mime)
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}{UPLOAD_PATH}", self.origin))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Transport(format!("{status}: {}", body.trim())));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("unexpected response: {e}")))?;
        let file_url = body
            .file_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| UploadError::Transport("response has no fileUrl".to_string()))?;

        Ok(hosted_url(&self.origin, &file_url))
    }
}

/// Join the host origin and the path it returned. Absolute URLs pass through.
pub fn hosted_url(origin: &str, file_url: &str) -> String {
    let file_url = file_url.trim();
    if file_url.starts_with("http://") || file_url.starts_with("https://") {
        return file_url.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        file_url.trim_start_matches('/')
    )
}
