//! One-line pointer files passed between the pipeline stages

use crate::error::{PipelineError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// A small text file holding a single path, written by one stage and read by the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    location: PathBuf,
}

impl Sentinel {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Where the sentinel lives on disk
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Read the recorded path, trimmed of surrounding whitespace
    ///
    /// # Errors
    /// - `MissingInput` when the sentinel does not exist or is blank
    /// - `Io` for any other read failure
    pub fn read(&self) -> Result<PathBuf> {
        let contents = match fs::read_to_string(&self.location) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::MissingInput(self.location.clone()));
            },
            Err(e) => return Err(PipelineError::file_io_error("read sentinel", &self.location, &e)),
        };

        let recorded = contents.trim();
        if recorded.is_empty() {
            return Err(PipelineError::MissingInput(self.location.clone()));
        }

        Ok(PathBuf::from(recorded))
    }

    /// Replace the recorded path.
    ///
    /// The new contents are written to a sibling temp file and renamed into
    /// place, so readers see either the old pointer or the new one.
    ///
    /// # Errors
    /// - Temp file creation, write, or rename failures
    pub fn write(&self, recorded: &Path) -> Result<()> {
        let parent = match self.location.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".sentinel")
            .tempfile_in(&parent)
            .map_err(|e| PipelineError::file_io_error("create temp sentinel in", &parent, &e))?;

        temp.write_all(recorded.to_string_lossy().as_bytes())
            .map_err(|e| PipelineError::file_io_error("write sentinel", temp.path(), &e))?;

        temp.persist(&self.location)
            .map_err(|e| PipelineError::file_io_error("replace sentinel", &self.location, &e.error))?;

        tracing::debug!(
            sentinel = %self.location.display(),
            recorded = %recorded.display(),
            "sentinel updated"
        );
        Ok(())
    }
}
