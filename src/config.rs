//! Configuration types for the fetch and removal stages

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Size of each write while streaming a download to disk
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Default location of the ONNX segmentation model for the tract engine
pub const DEFAULT_MODEL_PATH: &str = "models/isnet.onnx";

/// RGB distance under which the color-key engine treats a pixel as backdrop
pub const DEFAULT_COLOR_KEY_TOLERANCE: u16 = 60;

/// Filesystem layout and transfer settings shared by both stages.
///
/// Directory and sentinel names are relative to `root`. Paths recorded in
/// sentinels are kept relative so the layout matches what an operator sees
/// in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Working directory every relative path is resolved against
    pub root: PathBuf,
    /// Download output directory
    pub images_dir: PathBuf,
    /// Removal output directory
    pub processed_dir: PathBuf,
    /// Sentinel written by the fetcher
    pub current_sentinel: PathBuf,
    /// Sentinel written by the remover
    pub processed_sentinel: PathBuf,
    /// Bytes per disk write while streaming
    pub chunk_size: usize,
    /// `User-Agent` header sent with downloads
    pub user_agent: String,
    /// HTTP request timeout (client default when `None`)
    pub request_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            images_dir: PathBuf::from("images"),
            processed_dir: PathBuf::from("processed_images"),
            current_sentinel: PathBuf::from("current_image.txt"),
            processed_sentinel: PathBuf::from("processed_image.txt"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: default_user_agent(),
            request_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Create a builder for pipeline configuration
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Absolute-or-root-relative location of the download directory
    #[must_use]
    pub fn images_path(&self) -> PathBuf {
        self.root.join(&self.images_dir)
    }

    /// Location of the removal output directory
    #[must_use]
    pub fn processed_path(&self) -> PathBuf {
        self.root.join(&self.processed_dir)
    }

    /// Resolve a path read from a sentinel against the working directory
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    /// - Zero chunk size
    /// - Empty directory or sentinel names
    /// - Zero request timeout
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::invalid_config("chunk size must be non-zero"));
        }

        for (label, path) in [
            ("images directory", &self.images_dir),
            ("processed directory", &self.processed_dir),
            ("current-image sentinel", &self.current_sentinel),
            ("processed-image sentinel", &self.processed_sentinel),
        ] {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::invalid_config(format!(
                    "{label} must not be empty"
                )));
            }
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(PipelineError::invalid_config(
                "request timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the working directory
    #[must_use]
    pub fn root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.root = root.into();
        self
    }

    #[must_use]
    pub fn images_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    #[must_use]
    pub fn processed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any check in [`PipelineConfig::validate`] fails
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Which background-removal engine the remover should use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineConfig {
    /// Local ONNX segmentation model run with tract
    Tract { model_path: PathBuf },
    /// Remote removal service accepting a multipart `image` upload
    Http { endpoint: String },
    /// Corner-sampled colour keying for flat backdrops; needs no model
    ColorKey { tolerance: u16 },
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::Tract {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert_eq!(config.processed_dir, PathBuf::from("processed_images"));
        assert_eq!(config.current_sentinel, PathBuf::from("current_image.txt"));
        assert_eq!(config.processed_sentinel, PathBuf::from("processed_image.txt"));
        assert_eq!(config.chunk_size, 8192);
        assert!(config.user_agent.starts_with("cutout-pipeline/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let err = PipelineConfig::builder().chunk_size(0).build().unwrap_err();
        assert!(err.to_string().contains("chunk size"));

        let err = PipelineConfig::builder()
            .images_dir("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("images directory"));

        let err = PipelineConfig::builder()
            .request_timeout(Some(Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_resolve_against_root() {
        let config = PipelineConfig::builder().root("/srv/run").build().unwrap();
        assert_eq!(
            config.resolve(Path::new("images/a.jpg")),
            PathBuf::from("/srv/run/images/a.jpg")
        );
        assert_eq!(
            config.resolve(Path::new("/tmp/b.jpg")),
            PathBuf::from("/tmp/b.jpg")
        );
        assert_eq!(config.images_path(), PathBuf::from("/srv/run/images"));
    }
}
