#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Cutout Pipeline
//!
//! A two-stage image pipeline: the **fetcher** streams an image from a URL
//! into `images/image_<timestamp>.jpg` and records that path in
//! `current_image.txt`; the **remover** reads the pointer, runs a
//! background-removal engine, and writes
//! `processed_images/<stem>_transparent.png`, recording it in
//! `processed_image.txt`.
//!
//! The stages ship as the `fetcher` and `remover` binaries and communicate
//! only through those sentinel files. The same stages are available here as a
//! library, where [`Pipeline::run`] chains them without going through the
//! sentinels.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cutout_pipeline::{create_remover, EngineConfig, Pipeline, PipelineConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::builder().root("/srv/cutouts").build()?;
//! let remover = create_remover(&EngineConfig::Http {
//!     endpoint: "https://removal.example.com/remove-background".to_string(),
//! })?;
//!
//! let mut pipeline = Pipeline::new(config, remover)?.with_progress(true);
//! let run = pipeline
//!     .run("https://example.com/photo.jpg", chrono::Local::now().naive_local())
//!     .await?;
//! println!("{} -> {}", run.source_path.display(), run.output_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): local ONNX segmentation engine, pure Rust
//! - `cli` (default): the two binaries, progress bars, and tracing setup

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sentinel;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;

pub use backends::{create_remover, BackgroundRemover, ColorKeyBackend, HttpBackend};
#[cfg(feature = "tract")]
pub use backends::TractBackend;
pub use config::{EngineConfig, PipelineConfig, PipelineConfigBuilder};
pub use download::{image_file_name, is_image_content_type, FetchOutcome, ImageFetcher};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineRun};
pub use processor::{transparent_file_name, BackgroundRemovalProcessor, RemovalOutcome};
pub use sentinel::Sentinel;
pub use services::OutputFormatHandler;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
