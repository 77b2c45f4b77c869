//! Error types for pipeline stages

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Every way a fetch or removal run can fail.
///
/// All variants are terminal for the run; the CLI maps each of them to exit code 1.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Filesystem errors with operation context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network-layer failures (DNS, connect, timeout, reset, malformed URL)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The downloaded file is missing or has zero size
    #[error("Downloaded file is empty: {}", .0.display())]
    EmptyDownload(PathBuf),

    /// The current-image sentinel is absent, empty, or points at a missing file
    #[error("Input file {} does not exist", .0.display())]
    MissingInput(PathBuf),

    /// Image decode/encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Model loading errors
    #[error("Model error: {0}")]
    Model(String),

    /// The removal engine failed or produced unusable output
    #[error("Processing error: {0}")]
    Processing(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Create a transport error wrapping a `reqwest` failure
    pub fn transport<S: Into<String>>(msg: S, source: reqwest::Error) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create a transport error with no underlying client error
    pub fn transport_msg<S: Into<String>>(msg: S) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// Process exit code for this failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        1
    }
}
