//! Background-removal engines
//!
//! The remover stage only ever talks to [`BackgroundRemover`]; which engine
//! sits behind it is decided once, from [`EngineConfig`], by [`create_remover`].
//! - Tract backend (pure Rust ONNX inference on a local segmentation model)
//! - HTTP backend (multipart upload to a remote removal service)
//! - Color-key backend (corner-sampled backdrop keying, no model)

use crate::config::EngineConfig;
use crate::error::Result;
use async_trait::async_trait;

pub mod color_key;
pub mod http;
pub mod mask;

#[cfg(feature = "tract")]
pub mod tract;

pub use self::color_key::ColorKeyBackend;
pub use self::http::HttpBackend;
#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

/// Opaque background-removal capability: encoded image in, encoded image with alpha out
#[async_trait]
pub trait BackgroundRemover: Send {
    /// Short engine name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Remove the background from an encoded image
    ///
    /// # Errors
    /// - Input cannot be decoded
    /// - Engine failure (model inference, remote service error)
    async fn remove_background(&mut self, image: &[u8]) -> Result<Vec<u8>>;
}

/// Build the engine selected by `config`
///
/// # Errors
/// - Model missing or invalid (tract)
/// - Invalid endpoint or HTTP client construction failure (http)
/// - Requested engine not compiled in
pub fn create_remover(config: &EngineConfig) -> Result<Box<dyn BackgroundRemover>> {
    match config {
        #[cfg(feature = "tract")]
        EngineConfig::Tract { model_path } => Ok(Box::new(TractBackend::load(model_path)?)),
        #[cfg(not(feature = "tract"))]
        EngineConfig::Tract { .. } => Err(crate::error::PipelineError::invalid_config(
            "tract engine not available; rebuild with --features tract",
        )),
        EngineConfig::Http { endpoint } => Ok(Box::new(HttpBackend::new(endpoint)?)),
        EngineConfig::ColorKey { tolerance } => Ok(Box::new(ColorKeyBackend::new(*tolerance))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::path::PathBuf;

    #[test]
    fn test_create_http_remover() {
        let remover = create_remover(&EngineConfig::Http {
            endpoint: "https://removal.example.com/remove-background".to_string(),
        })
        .unwrap();
        assert_eq!(remover.name(), "http");
    }

    #[test]
    fn test_create_color_key_remover() {
        let remover = create_remover(&EngineConfig::ColorKey { tolerance: 60 }).unwrap();
        assert_eq!(remover.name(), "color-key");
    }

    #[test]
    fn test_create_remover_rejects_bad_endpoint() {
        let err = create_remover(&EngineConfig::Http {
            endpoint: "not a url".to_string(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_create_tract_remover_with_missing_model() {
        let err = create_remover(&EngineConfig::Tract {
            model_path: PathBuf::from("/nonexistent/isnet.onnx"),
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("/nonexistent/isnet.onnx"));
    }
}
