//! Tract backend for local background removal
//!
//! Runs an ONNX salient-object segmentation model (ISNet layout: one
//! `1×3×1024×1024` float input, a `1×1×1024×1024` mask as first output) with
//! Tract, a pure Rust inference library with no native dependencies.

use super::mask::{apply_mask, image_to_tensor, tensor_to_mask, Normalization, MODEL_INPUT_SIZE};
use super::BackgroundRemover;
use crate::error::{PipelineError, Result};
use crate::services::OutputFormatHandler;
use async_trait::async_trait;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;

type TractModel = TypedRunnableModel<TypedModel>;

/// Tract backend holding a loaded, optimised model
#[derive(Debug, Clone)]
pub struct TractBackend {
    model: Arc<TractModel>,
    model_path: PathBuf,
    normalization: Normalization,
}

impl TractBackend {
    /// Load and optimise the model at `model_path`
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - ONNX parse, optimisation, or plan construction failures
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(PipelineError::model(format!(
                "model file '{}' not found; pass --model or set CUTOUT_MODEL",
                model_path.display()
            )));
        }

        let load_start = Instant::now();
        let side = MODEL_INPUT_SIZE as usize;

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                PipelineError::model(format!(
                    "Failed to load ONNX model '{}': {e}",
                    model_path.display()
                ))
            })?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .map_err(|e| PipelineError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| PipelineError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| PipelineError::model(format!("Failed to create runnable model: {e}")))?;

        tracing::info!(
            model = %model_path.display(),
            elapsed_ms = load_start.elapsed().as_millis() as u64,
            "tract model ready"
        );

        Ok(Self {
            model: Arc::new(model),
            model_path: model_path.to_path_buf(),
            normalization: Normalization::default(),
        })
    }
}

#[async_trait]
impl BackgroundRemover for TractBackend {
    fn name(&self) -> &str {
        "tract"
    }

    async fn remove_background(&mut self, image: &[u8]) -> Result<Vec<u8>> {
        let model = Arc::clone(&self.model);
        let normalization = self.normalization;
        let input = image.to_vec();
        tracing::debug!(model = %self.model_path.display(), bytes = input.len(), "segmenting image");

        tokio::task::spawn_blocking(move || segment(&model, &input, &normalization))
            .await
            .map_err(|e| PipelineError::processing(format!("inference task failed: {e}")))?
    }
}

/// Decode, infer, and encode one image
fn segment(model: &TractModel, input: &[u8], normalization: &Normalization) -> Result<Vec<u8>> {
    let image = image::load_from_memory(input)?;
    let original = (image.width(), image.height());

    let (tensor, letterbox) = image_to_tensor(&image, MODEL_INPUT_SIZE, normalization);
    let output = infer(model, &tensor)?;
    let mask = tensor_to_mask(&output, original, &letterbox)?;

    OutputFormatHandler::encode_png(apply_mask(&image, &mask))
}

fn infer(model: &TractModel, input: &Array4<f32>) -> Result<Array4<f32>> {
    let started = Instant::now();

    let data: Vec<f32> = input.iter().copied().collect();
    let input_tensor = Tensor::from_shape(input.shape(), &data)
        .map_err(|e| PipelineError::processing(format!("Failed to build input tensor: {e}")))?;

    let outputs = model
        .run(tvec![input_tensor.into()])
        .map_err(|e| PipelineError::processing(format!("Tract inference failed: {e}")))?;

    let output = outputs
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::processing("No output tensor found"))?;

    let shape = output.shape().to_vec();
    let &[batch, channels, height, width] = shape.as_slice() else {
        return Err(PipelineError::processing(format!(
            "Expected 4D output tensor, got {}D",
            shape.len()
        )));
    };

    let values = output
        .as_slice::<f32>()
        .map_err(|e| PipelineError::processing(format!("Failed to read output tensor: {e}")))?
        .to_vec();

    let array = Array4::from_shape_vec((batch, channels, height, width), values)
        .map_err(|e| PipelineError::processing(format!("Failed to reshape output tensor: {e}")))?;

    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        shape = ?array.shape(),
        "tract inference complete"
    );
    Ok(array)
}
