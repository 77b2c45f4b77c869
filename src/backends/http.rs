//! Remote background removal over HTTP
//!
//! Uploads the image as the multipart field `image` to a removal service
//! (u2net-style `POST /remove-background` endpoints) and returns the response
//! body, which is expected to be the cut-out image.

use super::BackgroundRemover;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};

/// Longest slice of an error response body kept in diagnostics
const ERROR_BODY_EXCERPT: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
}

impl HttpBackend {
    /// Create a backend posting to `endpoint`
    ///
    /// # Errors
    /// - Endpoint is not an absolute HTTP(S) URL
    /// - Failed to create HTTP client
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            PipelineError::invalid_config(format!("Invalid removal endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(PipelineError::invalid_config(format!(
                "Removal endpoint must be http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::transport("Failed to create HTTP client", e))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl BackgroundRemover for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn remove_background(&mut self, image: &[u8]) -> Result<Vec<u8>> {
        let (mime, extension) = upload_type(image);
        let part = Part::bytes(image.to_vec())
            .file_name(format!("image.{extension}"))
            .mime_str(mime)
            .map_err(|e| PipelineError::transport("Failed to build upload", e))?;
        let form = Form::new().part("image", part);

        tracing::debug!(endpoint = %self.endpoint, bytes = image.len(), "uploading image for removal");

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::transport(format!("Removal request to {} failed", self.endpoint), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(PipelineError::processing(format!(
                "removal service returned HTTP {}: {}",
                status.as_u16(),
                excerpt.trim()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("Failed to read removal response", e))?;

        Ok(bytes.to_vec())
    }
}

/// MIME type and file extension to declare for the upload, sniffed from the bytes
fn upload_type(image: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(image) {
        Ok(image::ImageFormat::Png) => ("image/png", "png"),
        Ok(image::ImageFormat::Jpeg) => ("image/jpeg", "jpg"),
        Ok(image::ImageFormat::WebP) => ("image/webp", "webp"),
        Ok(image::ImageFormat::Gif) => ("image/gif", "gif"),
        _ => ("application/octet-stream", "bin"),
    }
}
