//! Model-free background removal for flat backdrops
//!
//! Samples the four corners, takes the corner colour that agrees best with
//! the others as the backdrop, and clears the alpha of every pixel within
//! `tolerance` of it (plus anything near-white). Works for product shots on a
//! plain white or solid-colour background; needs no model or network.

use super::BackgroundRemover;
use crate::error::{PipelineError, Result};
use crate::services::OutputFormatHandler;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};

/// Largest side of the square sampled at each corner
const MAX_CORNER_SIZE: u32 = 8;

/// Channels above this on all of R, G and B count as background
const WHITE_THRESHOLD: u8 = 240;

#[derive(Debug, Clone, Copy)]
pub struct ColorKeyBackend {
    tolerance: u16,
}

impl ColorKeyBackend {
    /// `tolerance` is the Euclidean RGB distance below which a pixel is keyed out
    #[must_use]
    pub fn new(tolerance: u16) -> Self {
        Self { tolerance }
    }
}

#[async_trait]
impl BackgroundRemover for ColorKeyBackend {
    fn name(&self) -> &str {
        "color-key"
    }

    async fn remove_background(&mut self, image: &[u8]) -> Result<Vec<u8>> {
        let tolerance = self.tolerance;
        let input = image.to_vec();

        tokio::task::spawn_blocking(move || key_out(&input, tolerance))
            .await
            .map_err(|e| PipelineError::processing(format!("color key task failed: {e}")))?
    }
}

fn key_out(input: &[u8], tolerance: u16) -> Result<Vec<u8>> {
    let mut rgba = image::load_from_memory(input)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(PipelineError::processing("input image has no pixels"));
    }

    let key = background_color(&rgba);
    let threshold = f32::from(tolerance);
    let mut cleared = 0usize;

    for pixel in rgba.pixels_mut() {
        if is_whitish(pixel) || distance(rgb(pixel), key) < threshold {
            pixel[3] = 0;
            cleared += 1;
        }
    }

    tracing::debug!(?key, tolerance, cleared, "color key applied");
    OutputFormatHandler::encode_png(rgba)
}

/// Corner colour with the smallest summed distance to the other corners
fn background_color(image: &RgbaImage) -> [u8; 3] {
    let (width, height) = image.dimensions();
    let size = (width.min(height) / 20).clamp(1, MAX_CORNER_SIZE);
    let right = width.saturating_sub(size);
    let bottom = height.saturating_sub(size);

    let corners = [(0, 0), (right, 0), (0, bottom), (right, bottom)]
        .map(|(x, y)| average_color(image, x, y, size));

    let spread = |color: &[u8; 3]| -> f32 {
        corners.iter().map(|other| distance(*color, *other)).sum()
    };

    corners
        .iter()
        .copied()
        .min_by(|a, b| spread(a).total_cmp(&spread(b)))
        .unwrap_or(corners[0])
}

fn average_color(image: &RgbaImage, x0: u32, y0: u32, size: u32) -> [u8; 3] {
    let mut sums = [0u64; 3];
    let mut count = 0u64;

    for y in y0..(y0 + size).min(image.height()) {
        for x in x0..(x0 + size).min(image.width()) {
            let pixel = image.get_pixel(x, y);
            for (sum, channel) in sums.iter_mut().zip(rgb(pixel)) {
                *sum += u64::from(channel);
            }
            count += 1;
        }
    }

    if count == 0 {
        return [0; 3];
    }
    sums.map(|sum| ((sum + count / 2) / count) as u8)
}

fn rgb(pixel: &Rgba<u8>) -> [u8; 3] {
    [pixel[0], pixel[1], pixel[2]]
}

fn is_whitish(pixel: &Rgba<u8>) -> bool {
    rgb(pixel).iter().all(|&channel| channel > WHITE_THRESHOLD)
}

fn distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, y)| {
            let d = f32::from(x) - f32::from(y);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
