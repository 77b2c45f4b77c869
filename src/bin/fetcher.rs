//! Fetch stage: `fetcher <image_url>`
//!
//! Streams the image into `images/image_<timestamp>.jpg` and records the path
//! in `current_image.txt`.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    cutout_pipeline::cli::fetcher::main().await
}
