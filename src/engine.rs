// src/engine.rs
//
// The transform pipeline. Every operation:
// 1. Decodes its source under a scoped binding
// 2. Plans geometry with pure functions
// 3. Draws into a fresh raster surface and encodes it
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod binding;
mod color;
mod common;
mod config;
mod decoder;
mod encoder;
mod geometry;
mod metadata;
mod resample;
mod resource;
mod surface;
#[cfg(feature = "async")]
mod tasks;
mod validation;

pub use api::{
    ImagePipeline, COLLAGE_NAME, DEFAULT_THUMBNAIL_SIZE, DERIVED_QUALITY, THUMBNAIL_QUALITY,
};
pub use binding::{BindingRegistry, BindingStats, SourceBinding, DEFAULT_DECODE_BUDGET_BYTES};
pub use color::{quantize_channel, rank_colors, ColorAnalyzerConfig, ColorSample};
pub use common::{run_with_panic_policy, EngineResult};
pub use config::{PipelineConfig, ENV_CROP_POLICY, ENV_DECODE_BUDGET_MB, ENV_MAX_UPLOAD_MB};
pub use decoder::{check_dimensions, detect_format, Decoder, DrawableHandle};
pub use encoder::{
    encode, encode_gif, encode_jpeg, encode_png, encode_rgba, encode_webp, QualitySettings,
};
pub use geometry::{
    fit_within, fit_within_f64, plan_crop, watermark_anchor, CropPolicy, GridLayout, Placement,
    Rect, Size,
};
pub use metadata::{ImageMetadata, METADATA_COLOR_COUNT, SQUARE_TOLERANCE_PX};
pub use resample::resize_rgba;
pub use resource::{replace_extension, ImageResource};
pub use surface::{
    check_surface_size, FontSpec, ImageSurface, ImageSurfaceFactory, RasterSurface,
    SurfaceFactory,
};
#[cfg(feature = "async")]
pub use tasks::AsyncPipeline;
pub use validation::{
    format_file_size, validate, ValidationConfig, ValidationResult, MISSING_FILE_MESSAGE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ResizeOptions;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn jpeg(width: u32, height: u32) -> ImageResource {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([90, 120, 150, 255]),
        ));
        ImageResource::new(encode_jpeg(&img, 85).unwrap(), "image/jpeg", "big.jpg")
    }

    #[test]
    fn test_resize_scenario_4000x3000() {
        let pipeline = ImagePipeline::new();
        let out = pipeline
            .resize(&jpeg(4000, 3000), &ResizeOptions::bounds(1920, 1080))
            .unwrap();
        assert_eq!(pipeline.dimensions(&out).unwrap(), Size::new(1440, 1080));
    }

    #[test]
    fn test_every_decode_releases_its_binding() {
        let pipeline = ImagePipeline::new();
        let source = jpeg(64, 48);
        for _ in 0..5 {
            pipeline.thumbnail(&source, 16).unwrap();
        }
        let bad = ImageResource::new(vec![0xFF, 0xD8, 0xFF, 0x00], "image/jpeg", "bad.jpg");
        assert!(pipeline.compress(&bad, 0.5).is_err());

        let stats = pipeline.decoder().registry().stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.acquired, stats.released);
        assert_eq!(stats.acquired, 6);
    }

    #[test]
    fn test_limits_match_surface_checks() {
        assert!(check_surface_size(Size::new(MAX_DIMENSION, 1)).is_ok());
        assert!(check_surface_size(Size::new(20_000, 20_000)).is_err());
    }
}
