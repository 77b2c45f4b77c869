//! Removal stage: current image in, transparent PNG out
//!
//! The processor resolves its input, runs the configured engine, and promotes
//! the result onto `processed_images/<stem>_transparent.png` with a rename, so
//! the final path only ever holds a complete file. The processed-image
//! sentinel is written last and only on success.

use crate::backends::BackgroundRemover;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::sentinel::Sentinel;
use crate::services::OutputFormatHandler;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the input stem to name the output
pub const TRANSPARENT_SUFFIX: &str = "_transparent.png";

/// Result of a successful removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    /// Input path as recorded in the current-image sentinel
    pub input_path: PathBuf,
    /// Output path as recorded in the processed-image sentinel
    pub output_path: PathBuf,
    /// Engine that produced the output
    pub engine: String,
}

/// Output file name for `input`: its stem with `_transparent.png` appended
///
/// # Errors
/// - `input` has no file name to derive a stem from
pub fn transparent_file_name(input: &Path) -> Result<String> {
    let stem = input
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            PipelineError::processing(format!(
                "cannot derive an output name from '{}'",
                input.display()
            ))
        })?;
    Ok(format!("{}{TRANSPARENT_SUFFIX}", stem.to_string_lossy()))
}

/// Runs one background removal against the configured layout
pub struct BackgroundRemovalProcessor {
    config: PipelineConfig,
    remover: Box<dyn BackgroundRemover>,
}

impl BackgroundRemovalProcessor {
    #[must_use]
    pub fn new(config: PipelineConfig, remover: Box<dyn BackgroundRemover>) -> Self {
        Self { config, remover }
    }

    /// Read the current-image sentinel and confirm the file it names exists
    ///
    /// # Errors
    /// - `MissingInput` when the sentinel is absent/blank or its file is gone
    pub fn current_input(config: &PipelineConfig) -> Result<PathBuf> {
        let sentinel = Sentinel::new(config.root.join(&config.current_sentinel));
        let input = sentinel.read()?;
        debug!(sentinel = %sentinel.location().display(), input = %input.display(), "read current image");

        if !config.resolve(&input).is_file() {
            return Err(PipelineError::MissingInput(input));
        }
        Ok(input)
    }

    /// Process the image named by the current-image sentinel
    ///
    /// # Errors
    /// - `MissingInput` when the sentinel is absent/blank or its file is gone
    /// - Any error from [`Self::process_file`]
    pub async fn process_current(&mut self) -> Result<RemovalOutcome> {
        let input = Self::current_input(&self.config)?;
        self.process_file(&input).await
    }

    /// Process `input` (relative to the working directory or absolute)
    ///
    /// # Errors
    /// - `MissingInput` when `input` does not exist; the engine is not called
    /// - File system errors reading input or writing output
    /// - Engine failures and unusable engine output
    pub async fn process_file(&mut self, input: &Path) -> Result<RemovalOutcome> {
        let resolved = self.config.resolve(input);
        if !resolved.is_file() {
            return Err(PipelineError::MissingInput(input.to_path_buf()));
        }

        let processed_path = self.config.processed_path();
        tokio::fs::create_dir_all(&processed_path)
            .await
            .map_err(|e| PipelineError::file_io_error("create directory", &processed_path, &e))?;

        let file_name = transparent_file_name(input)?;
        let recorded_output = self.config.processed_dir.join(&file_name);
        let final_path = processed_path.join(&file_name);

        info!(input = %input.display(), engine = self.remover.name(), "removing background");

        let image_bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| PipelineError::file_io_error("read input image", &resolved, &e))?;

        let output = self.remover.remove_background(&image_bytes).await?;
        let output = OutputFormatHandler::ensure_png(output)?;

        write_atomically(&processed_path, &final_path, &output)?;
        debug!(bytes = output.len(), path = %final_path.display(), "output promoted");

        Sentinel::new(self.config.root.join(&self.config.processed_sentinel))
            .write(&recorded_output)?;

        Ok(RemovalOutcome {
            input_path: input.to_path_buf(),
            output_path: recorded_output,
            engine: self.remover.name().to_string(),
        })
    }
}

/// Write `data` to a temp file in `dir` and rename it onto `final_path`,
/// replacing whatever was there. On error the temp file is removed and
/// `final_path` is left as it was.
fn write_atomically(dir: &Path, final_path: &Path, data: &[u8]) -> Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".removal")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::file_io_error("create temp file in", dir, &e))?;

    temp.write_all(data)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| PipelineError::file_io_error("write output", temp.path(), &e))?;

    temp.persist(final_path)
        .map_err(|e| PipelineError::file_io_error("move output to", final_path, &e.error))?;
    Ok(())
}
