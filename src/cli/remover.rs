//! `remover`: cut the background out of the current image

use super::{init_tracing, parse_args_from, report_failure};
use crate::backends::create_remover;
use crate::config::{
    EngineConfig, PipelineConfig, DEFAULT_COLOR_KEY_TOLERANCE, DEFAULT_MODEL_PATH,
};
use crate::error::PipelineError;
use crate::processor::{BackgroundRemovalProcessor, RemovalOutcome};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum EngineKind {
    /// Local ONNX model run with tract
    Tract,
    /// Remote removal service
    Http,
    /// Key out a flat backdrop sampled from the corners; no model needed
    ColorKey,
}

/// Remove the background of the image named in current_image.txt
#[derive(Parser, Debug)]
#[command(name = "remover", version, about, long_about = None)]
pub struct RemoverCli {
    /// Directory holding the sentinel files and output directories
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Background-removal engine
    #[arg(short, long, value_enum, default_value_t = EngineKind::Tract)]
    pub engine: EngineKind,

    /// ONNX segmentation model for the tract engine (relative to --workdir)
    #[arg(short, long, env = "CUTOUT_MODEL", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Removal service URL for the http engine
    #[arg(long, env = "CUTOUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// RGB distance from the backdrop colour cleared by the color-key engine
    #[arg(long, value_name = "DIST", default_value_t = DEFAULT_COLOR_KEY_TOLERANCE,
          value_parser = clap::value_parser!(u16).range(0..=441))]
    pub tolerance: u16,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl RemoverCli {
    fn engine_config(&self, config: &PipelineConfig) -> Result<EngineConfig, PipelineError> {
        match self.engine {
            EngineKind::Tract => Ok(EngineConfig::Tract {
                model_path: config.resolve(&self.model),
            }),
            EngineKind::Http => {
                let endpoint = self.endpoint.clone().ok_or_else(|| {
                    PipelineError::invalid_config(
                        "the http engine needs --endpoint or CUTOUT_ENDPOINT",
                    )
                })?;
                Ok(EngineConfig::Http { endpoint })
            },
            EngineKind::ColorKey => Ok(EngineConfig::ColorKey {
                tolerance: self.tolerance,
            }),
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = match parse_args_from::<RemoverCli, _, _>(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(outcome) => {
            println!(
                "Background removed successfully. Saved as {}",
                outcome.output_path.display()
            );
            ExitCode::SUCCESS
        },
        Err(e) => report_failure(&e),
    }
}

async fn run(cli: &RemoverCli) -> Result<RemovalOutcome> {
    let config = PipelineConfig::builder()
        .root(&cli.workdir)
        .build()
        .context("invalid remover configuration")?;

    // Validate the input before paying for engine start-up
    let input = BackgroundRemovalProcessor::current_input(&config)?;
    println!("Removing background from {}", input.display());

    let engine = cli.engine_config(&config)?;
    let remover = create_remover(&engine).context("Error initialising removal engine")?;

    let mut processor = BackgroundRemovalProcessor::new(config, remover);
    processor
        .process_file(&input)
        .await
        .context("Error removing background")
}
