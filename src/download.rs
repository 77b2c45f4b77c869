//! Streaming image download for the fetch stage
//!
//! Downloads one image URL into the images directory under a timestamped name
//! and points the current-image sentinel at it. The body is streamed into a
//! temp file next to the final location and only renamed into place once it
//! is known to be non-empty, so a failed run never leaves a partial file
//! behind a sentinel.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::sentinel::Sentinel;
use chrono::NaiveDateTime;
use futures_util::StreamExt;
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Path recorded in the sentinel, relative to the working directory
    pub path: PathBuf,
    /// Bytes written to disk
    pub bytes_written: u64,
    /// `Content-Type` declared by the server, if any
    pub content_type: Option<String>,
}

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
pub enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    /// Create a byte-oriented progress bar, or a no-op when disabled
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        {
            if enabled {
                let pb = ProgressBar::new(0);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
                ) {
                    pb.set_style(style.progress_chars("#>-"));
                }
                return Self::Indicatif(pb);
            }
        }
        let _ = enabled;
        Self::NoOp
    }

    pub fn set_length(&self, len: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_length(len),
            Self::NoOp => {},
        }
    }

    pub fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_position(pos),
            Self::NoOp => {},
        }
    }

    pub fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_with_message(msg),
            Self::NoOp => {
                let _ = msg;
            },
        }
    }
}

/// File name for an image downloaded at `at`, e.g. `image_20240101_120000.jpg`
#[must_use]
pub fn image_file_name(at: NaiveDateTime) -> String {
    format!("image_{}.jpg", at.format("%Y%m%d_%H%M%S"))
}

/// Whether a declared content type looks like an image
#[must_use]
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("image/"))
}

/// Downloads images into the configured layout
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    config: PipelineConfig,
}

impl ImageFetcher {
    /// Create a fetcher with an HTTP client built from the configuration
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PipelineError::transport("Failed to create HTTP client", e))?;

        Ok(Self { client, config })
    }

    /// Download `url` as the image taken at `at` and record it in the sentinel
    ///
    /// # Errors
    /// - Malformed or non-HTTP(S) URL
    /// - Network errors during the request or while streaming the body
    /// - Non-2xx response status
    /// - Empty response body
    /// - File system errors creating, writing, or renaming the download
    pub async fn fetch(
        &self,
        url: &str,
        at: NaiveDateTime,
        show_progress: bool,
    ) -> Result<FetchOutcome> {
        let url = parse_download_url(url)?;

        let images_path = self.config.images_path();
        tokio::fs::create_dir_all(&images_path)
            .await
            .map_err(|e| PipelineError::file_io_error("create directory", &images_path, &e))?;

        tracing::info!(%url, "downloading image");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PipelineError::transport(format!("Failed to download {url}"), e))?;

        if !response.status().is_success() {
            return Err(PipelineError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !is_image_content_type(content_type.as_deref()) {
            tracing::warn!(
                content_type = content_type.as_deref().unwrap_or("<none>"),
                "response does not declare an image content type, saving anyway"
            );
        }

        let progress = ProgressIndicator::new(show_progress);
        if let Some(total) = response.content_length() {
            progress.set_length(total);
        }

        let temp = tempfile::Builder::new()
            .prefix(".download")
            .suffix(".part")
            .tempfile_in(&images_path)
            .map_err(|e| PipelineError::file_io_error("create temp file in", &images_path, &e))?;

        let bytes_written = {
            let handle = temp
                .as_file()
                .try_clone()
                .map_err(|e| PipelineError::file_io_error("open temp file", temp.path(), &e))?;
            let mut file = tokio::fs::File::from_std(handle);
            let mut stream = response.bytes_stream();
            let mut written = 0u64;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk
                    .map_err(|e| PipelineError::transport("Failed to read download stream", e))?;

                // keep-alive artifacts
                if chunk.is_empty() {
                    continue;
                }

                for piece in chunk.chunks(self.config.chunk_size) {
                    file.write_all(piece)
                        .await
                        .map_err(|e| PipelineError::file_io_error("write to file", temp.path(), &e))?;
                    written += piece.len() as u64;
                }
                progress.set_position(written);
            }

            file.flush()
                .await
                .map_err(|e| PipelineError::file_io_error("flush file", temp.path(), &e))?;
            written
        };

        let file_name = image_file_name(at);
        let recorded = self.config.images_dir.join(&file_name);

        if let Err(e) = verify_download(temp.path(), &recorded).await {
            progress.finish_with_message("download failed".to_string());
            tracing::debug!(error = %e, "discarding download");
            return Err(e);
        }

        let final_path = images_path.join(&file_name);
        temp.persist(&final_path)
            .map_err(|e| PipelineError::file_io_error("move download to", &final_path, &e.error))?;

        progress.finish_with_message(format!("saved {}", recorded.display()));
        tracing::debug!(bytes = bytes_written, path = %final_path.display(), "download complete");

        Sentinel::new(self.config.root.join(&self.config.current_sentinel)).write(&recorded)?;

        Ok(FetchOutcome {
            path: recorded,
            bytes_written,
            content_type,
        })
    }
}

fn parse_download_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| PipelineError::transport_msg(format!("Invalid URL '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PipelineError::transport_msg(format!(
            "Unsupported URL scheme '{other}' in '{url}'"
        ))),
    }
}

/// Confirm a written file exists and holds at least one byte
/// Check the staged download at `path` is non-empty; `recorded` names it in errors
async fn verify_download(path: &Path, recorded: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| PipelineError::file_io_error("inspect download", path, &e))?;
    if metadata.len() == 0 {
        return Err(PipelineError::EmptyDownload(recorded.to_path_buf()));
    }
    Ok(())
}
