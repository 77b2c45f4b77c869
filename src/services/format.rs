//! Output format handling service
//!
//! Every removal result is stored as PNG. Engines hand back encoded bytes in
//! whatever format they produce; this service makes sure what reaches disk
//! under a `.png` name really is a PNG with an alpha channel.

use crate::error::{PipelineError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Service for PNG encoding and normalisation of engine output
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA image as PNG bytes
    ///
    /// # Errors
    /// - PNG encoder failure
    pub fn encode_png(rgba_image: RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba_image).write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Return `bytes` unchanged when they decode as PNG, otherwise decode and
    /// re-encode as RGBA PNG
    ///
    /// # Errors
    /// - Empty engine output
    /// - PNG signature over a truncated or corrupt stream
    /// - Bytes that no enabled decoder understands
    pub fn ensure_png(bytes: Vec<u8>) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(PipelineError::processing("removal engine returned no data"));
        }

        match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => {
                image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(|e| {
                    PipelineError::processing(format!("removal engine returned a corrupt PNG: {e}"))
                })?;
                Ok(bytes)
            },
            Ok(format) => {
                tracing::debug!(?format, "re-encoding engine output as PNG");
                let decoded = image::load_from_memory_with_format(&bytes, format)?;
                Self::encode_png(decoded.to_rgba8())
            },
            Err(e) => Err(PipelineError::processing(format!(
                "removal engine returned unrecognised image data: {e}"
            ))),
        }
    }
}
