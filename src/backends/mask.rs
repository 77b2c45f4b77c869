//! Tensor preparation and mask application for segmentation models
//!
//! Images are letterboxed into a square model input (aspect-preserving resize,
//! centred on a white canvas) and the model's single-channel output is mapped
//! back through the same geometry to become the alpha channel.

use crate::error::{PipelineError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbaImage};
use ndarray::Array4;

/// Side length of the square model input
pub const MODEL_INPUT_SIZE: u32 = 1024;

/// Per-channel normalisation applied after scaling pixels to `0..=1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    /// ISNet general-use preprocessing
    fn default() -> Self {
        Self {
            mean: [0.5, 0.5, 0.5],
            std: [1.0, 1.0, 1.0],
        }
    }
}

/// How an image of a given size was placed inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub size: u32,
}

impl Letterbox {
    #[must_use]
    pub fn new(original: (u32, u32), size: u32) -> Self {
        let (width, height) = original;
        let size_f32 = size as f32;
        let scale = (size_f32 / width.max(1) as f32).min(size_f32 / height.max(1) as f32);

        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (size - scaled_width) / 2,
            offset_y: (size - scaled_height) / 2,
            size,
        }
    }

    /// Model-input coordinate for an original pixel, if it lands inside the input
    fn project(&self, x: u32, y: u32) -> Option<(usize, usize)> {
        let tx = (x as f32 * self.scale).round() as u32 + self.offset_x;
        let ty = (y as f32 * self.scale).round() as u32 + self.offset_y;
        (tx < self.size && ty < self.size).then_some((tx as usize, ty as usize))
    }
}

/// Convert an image into a normalised NCHW tensor of shape `1×3×size×size`
#[must_use]
pub fn image_to_tensor(
    image: &DynamicImage,
    size: u32,
    normalization: &Normalization,
) -> (Array4<f32>, Letterbox) {
    let rgb_image = image.to_rgb8();
    let letterbox = Letterbox::new(rgb_image.dimensions(), size);

    let resized = image::imageops::resize(
        &rgb_image,
        letterbox.scaled_width,
        letterbox.scaled_height,
        image::imageops::FilterType::Triangle,
    );

    let mut canvas = ImageBuffer::from_pixel(size, size, image::Rgb([255u8, 255, 255]));
    image::imageops::replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.offset_x),
        i64::from(letterbox.offset_y),
    );

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

    #[allow(clippy::indexing_slicing)]
    // Safe: tensor dimensions pre-allocated to match canvas size
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = (f32::from(pixel[channel]) / 255.0
                - normalization.mean[channel])
                / normalization.std[channel];
        }
    }

    (tensor, letterbox)
}

/// Map a `1×1×H×W` model output back to an 8-bit mask at the original size.
///
/// Values are min-max stretched first; models differ in how close to 0 and 1
/// their raw outputs get.
///
/// # Errors
/// - Output tensor is not a single-channel single-batch tensor
pub fn tensor_to_mask(
    tensor: &Array4<f32>,
    original: (u32, u32),
    letterbox: &Letterbox,
) -> Result<GrayImage> {
    let shape = tensor.shape();
    if shape.first().copied() != Some(1) || shape.get(1).copied() != Some(1) {
        return Err(PipelineError::processing(format!(
            "Invalid output tensor shape {shape:?}, expected [1, 1, H, W]"
        )));
    }
    let mask_height = shape.get(2).copied().unwrap_or(0);
    let mask_width = shape.get(3).copied().unwrap_or(0);

    let (min, max) = tensor
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let (width, height) = original;
    let mask = GrayImage::from_fn(width, height, |x, y| {
        let value = letterbox
            .project(x, y)
            .filter(|&(tx, ty)| tx < mask_width && ty < mask_height)
            .and_then(|(tx, ty)| tensor.get([0, 0, ty, tx]).copied())
            .map_or(0.0, |v| if range > f32::EPSILON { (v - min) / range } else { v });
        Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
    });

    Ok(mask)
}

/// Use `mask` as the alpha channel of `image`; fully transparent pixels are zeroed
#[must_use]
pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    for (x, y, pixel) in rgba.enumerate_pixels_mut() {
        let alpha = mask.get_pixel_checked(x, y).map_or(0, |p| p[0]);
        *pixel = if alpha == 0 {
            image::Rgba([0, 0, 0, 0])
        } else {
            image::Rgba([pixel[0], pixel[1], pixel[2], alpha])
        };
    }
    rgba
}
