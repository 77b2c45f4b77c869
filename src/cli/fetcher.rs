//! `fetcher <image_url>`: download an image and make it the current image

use super::{init_tracing, parse_args_from, report_failure};
use crate::config::PipelineConfig;
use crate::download::{FetchOutcome, ImageFetcher};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Download an image into images/ and record it in current_image.txt
#[derive(Parser, Debug)]
#[command(name = "fetcher", version, about, long_about = None)]
pub struct FetcherCli {
    /// URL of the image to download
    #[arg(value_name = "IMAGE_URL")]
    pub image_url: String,

    /// Directory holding images/ and the sentinel files
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Request timeout in seconds [default: no timeout]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Override the User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Show a download progress bar
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl FetcherCli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .root(&self.workdir)
            .request_timeout(self.timeout.map(Duration::from_secs));
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder.build().context("invalid fetcher configuration")
    }
}

pub async fn main() -> ExitCode {
    let cli = match parse_args_from::<FetcherCli, _, _>(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(outcome) => {
            println!("Image downloaded and saved as {}", outcome.path.display());
            ExitCode::SUCCESS
        },
        Err(e) => report_failure(&e),
    }
}

async fn run(cli: &FetcherCli) -> Result<FetchOutcome> {
    let fetcher = ImageFetcher::new(cli.pipeline_config()?)?;
    let now = chrono::Local::now().naive_local();

    fetcher
        .fetch(&cli.image_url, now, cli.progress)
        .await
        .with_context(|| format!("Error downloading image from {}", cli.image_url))
}
