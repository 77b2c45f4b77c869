//! Both stages in one process
//!
//! The binaries talk to each other only through sentinel files. Inside a
//! single process the fetched path is handed straight to the removal step;
//! the sentinels are still updated so separate `remover` runs keep working.

use crate::backends::BackgroundRemover;
use crate::config::PipelineConfig;
use crate::download::{FetchOutcome, ImageFetcher};
use crate::error::Result;
use crate::processor::{BackgroundRemovalProcessor, RemovalOutcome};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Paths produced by a chained fetch + removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub bytes_downloaded: u64,
    pub engine: String,
}

pub struct Pipeline {
    fetcher: ImageFetcher,
    processor: BackgroundRemovalProcessor,
    show_progress: bool,
}

impl Pipeline {
    /// Create a pipeline over `config` using `remover` for the second stage
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn new(config: PipelineConfig, remover: Box<dyn BackgroundRemover>) -> Result<Self> {
        config.validate()?;
        let fetcher = ImageFetcher::new(config.clone())?;
        let processor = BackgroundRemovalProcessor::new(config, remover);
        Ok(Self {
            fetcher,
            processor,
            show_progress: false,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetch stage only
    ///
    /// # Errors
    /// - See [`ImageFetcher::fetch`]
    pub async fn fetch(&self, url: &str, at: NaiveDateTime) -> Result<FetchOutcome> {
        self.fetcher.fetch(url, at, self.show_progress).await
    }

    /// Removal stage only, reading its input from the current-image sentinel
    ///
    /// # Errors
    /// - See [`BackgroundRemovalProcessor::process_current`]
    pub async fn remove(&mut self) -> Result<RemovalOutcome> {
        self.processor.process_current().await
    }

    /// Fetch `url`, then remove the background of exactly that download
    ///
    /// # Errors
    /// - Any fetch error; removal is not attempted
    /// - Any removal error; the processed-image sentinel is not written
    pub async fn run(&mut self, url: &str, at: NaiveDateTime) -> Result<PipelineRun> {
        let fetched = self.fetch(url, at).await?;
        let removed = self.processor.process_file(&fetched.path).await?;

        Ok(PipelineRun {
            source_path: fetched.path,
            output_path: removed.output_path,
            bytes_downloaded: fetched.bytes_written,
            engine: removed.engine,
        })
    }
}
