//! Removal stage: `remover`
//!
//! Reads `current_image.txt`, removes the background, writes
//! `processed_images/<stem>_transparent.png`, and records it in
//! `processed_image.txt`.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    cutout_pipeline::cli::remover::main().await
}
