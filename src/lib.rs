// lib.rs
//
// lazy-canvas: in-process image transforms for upload flows
//
// Design goals:
// - Decode, draw, encode; nothing retained between calls
// - Decode bindings released on every exit path
// - Drawing target is pluggable (SurfaceFactory)
// - Optional async facade with cancellation

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    ColorAnalyzerConfig, ColorSample, CropPolicy, ImageMetadata, ImagePipeline, ImageResource,
    PipelineConfig, Size, ValidationConfig, ValidationResult,
};
#[cfg(feature = "async")]
pub use engine::AsyncPipeline;
pub use error::{CanvasError, ErrorCategory, Result};
pub use ops::{
    CollageOptions, CropOptions, MimeType, ResizeOptions, WatermarkOptions, WatermarkPosition,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// MIME types accepted as input and producible as output.
pub fn supported_formats() -> Vec<&'static str> {
    MimeType::ALL.iter().map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_crate_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_supported_formats() {
        assert_eq!(
            supported_formats(),
            vec!["image/jpeg", "image/png", "image/webp", "image/gif"]
        );
    }
}
