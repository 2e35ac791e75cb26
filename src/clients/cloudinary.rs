use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::CloudinaryConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Thin bridge to the image CDN. Uploads go through an unsigned preset so no
/// request signing is needed; the preset restricts allowed transformations.
#[derive(Clone)]
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    client: Client,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds.into(),
            ))
            .user_agent("Duka/1.0")
            .build()
            .context("Failed to build Cloudinary HTTP client")?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub fn product_folder(&self) -> &str {
        &self.config.product_folder
    }

    #[must_use]
    pub fn media_folder(&self) -> &str {
        &self.config.media_folder
    }

    /// Forward one file's bytes and return the public URL.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        folder: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/{}/image/upload",
            self.config.base_url, self.config.cloud_name
        );

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .context("Invalid content type for upload")?;

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Cloudinary upload failed: {status} - {text}"));
        }

        let uploaded: UploadResponse = response.json().await?;
        debug!(url = %uploaded.secure_url, folder = %folder, "File uploaded to CDN");
        Ok(uploaded.secure_url)
    }
}
