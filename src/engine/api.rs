// src/engine/api.rs
//
// ImagePipeline: the public transform operations.
//
// Every operation follows the same shape: decode the source, plan geometry,
// draw into a fresh surface, encode, and wrap the bytes as a new resource.
// Decode and draw errors propagate unchanged; a failed or empty encode
// becomes `OperationFailed` naming the operation.

use crate::engine::color::{rank_colors, ColorSample};
use crate::engine::common::EngineResult;
use crate::engine::config::PipelineConfig;
use crate::engine::decoder::{Decoder, DrawableHandle};
use crate::engine::geometry::{
    fit_within, plan_crop, watermark_anchor, GridLayout, Placement, Rect, Size,
};
use crate::engine::metadata::{ImageMetadata, METADATA_COLOR_COUNT};
use crate::engine::resource::{replace_extension, ImageResource};
use crate::engine::surface::{FontSpec, ImageSurfaceFactory, RasterSurface, SurfaceFactory};
use crate::engine::validation::{validate, ValidationResult};
use crate::error::CanvasError;
use crate::ops::{
    parse_color, CollageOptions, CropOptions, MimeType, ResizeOptions, WatermarkOptions,
};
use image::Rgba;
use rayon::prelude::*;
use tracing::{debug, warn};

pub const THUMBNAIL_QUALITY: f32 = 0.7;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;
/// Quality for crop, convert, collage and watermark output.
pub const DERIVED_QUALITY: f32 = 0.9;
pub const COLLAGE_NAME: &str = "collage.jpg";

const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Transform pipeline over a pluggable raster surface.
#[derive(Debug)]
pub struct ImagePipeline<F = ImageSurfaceFactory> {
    factory: F,
    decoder: Decoder,
    config: PipelineConfig,
}

impl ImagePipeline<ImageSurfaceFactory> {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::with_factory(ImageSurfaceFactory, config)
    }
}

impl Default for ImagePipeline<ImageSurfaceFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SurfaceFactory> ImagePipeline<F> {
    pub fn with_factory(factory: F, config: PipelineConfig) -> Self {
        Self {
            factory,
            decoder: Decoder::new(config.decode_budget_bytes),
            config,
        }
    }

    /// Share a decoder (and its binding budget) with other pipelines.
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    pub fn validate(&self, file: Option<&ImageResource>) -> ValidationResult {
        validate(file, &self.config.validation)
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    /// Aspect-fit into `options` bounds, never upscaling.
    pub fn resize(&self, resource: &ImageResource, options: &ResizeOptions) -> EngineResult<ImageResource> {
        if options.max_width == 0 || options.max_height == 0 {
            return Err(CanvasError::invalid_resize_dimensions(
                options.max_width,
                options.max_height,
            ));
        }
        let handle = self.decoder.decode(resource)?;
        let source = handle.dimensions();
        let target = fit_within(source, options.max_width, options.max_height);
        debug!(
            name = resource.name(),
            %source,
            %target,
            format = %options.format,
            "resize"
        );

        let mut surface = self.factory.allocate(target)?;
        surface.draw_image(&handle, Rect::full(source), Placement::covering(target))?;
        drop(handle);
        finish(
            &surface,
            options.format,
            options.quality,
            resource.name().to_string(),
            "resize image",
        )
    }

    /// Square-bounded JPEG preview.
    pub fn thumbnail(&self, resource: &ImageResource, size: u32) -> EngineResult<ImageResource> {
        let options = ResizeOptions::bounds(size, size)
            .quality(THUMBNAIL_QUALITY)
            .format(MimeType::Jpeg);
        self.resize(resource, &options)
    }

    /// Re-encode as JPEG at natural size.
    pub fn compress(&self, resource: &ImageResource, quality: f32) -> EngineResult<ImageResource> {
        let handle = self.decoder.decode(resource)?;
        let size = handle.dimensions();
        debug!(name = resource.name(), %size, quality, "compress");

        let mut surface = self.factory.allocate(size)?;
        surface.draw_image(&handle, Rect::full(size), Placement::covering(size))?;
        drop(handle);
        finish(
            &surface,
            MimeType::Jpeg,
            quality,
            resource.name().to_string(),
            "compress image",
        )
    }

    /// Cut out `options`; out-of-bounds handling follows the configured crop policy.
    pub fn crop(&self, resource: &ImageResource, options: &CropOptions) -> EngineResult<ImageResource> {
        let handle = self.decoder.decode(resource)?;
        let rect = plan_crop(options, handle.dimensions(), self.config.crop_policy)?;
        let format = source_format(resource);
        debug!(name = resource.name(), ?rect, %format, "crop");

        let mut surface = self.factory.allocate(rect.size())?;
        surface.draw_image(&handle, rect, Placement::covering(rect.size()))?;
        drop(handle);
        finish(
            &surface,
            format,
            DERIVED_QUALITY,
            resource.name().to_string(),
            "crop image",
        )
    }

    /// Re-encode as `target`, renaming the extension. PNG output is flattened onto white.
    pub fn convert_format(&self, resource: &ImageResource, target: MimeType) -> EngineResult<ImageResource> {
        let handle = self.decoder.decode(resource)?;
        let size = handle.dimensions();
        debug!(name = resource.name(), from = resource.mime(), to = %target, "convert");

        let mut surface = self.factory.allocate(size)?;
        if target == MimeType::Png {
            surface.fill(OPAQUE_WHITE);
        }
        surface.draw_image(&handle, Rect::full(size), Placement::covering(size))?;
        drop(handle);
        finish(
            &surface,
            target,
            DERIVED_QUALITY,
            replace_extension(resource.name(), target.extension()),
            "convert image",
        )
    }

    /// Lay `images` out on a grid over a filled background. Always JPEG.
    pub fn collage(&self, images: &[ImageResource], options: &CollageOptions) -> EngineResult<ImageResource> {
        let canvas = Size::new(options.width, options.height);
        let grid = GridLayout::plan(images.len(), canvas, options.padding)?;
        let background = parse_color(&options.background_color)?;
        debug!(
            count = images.len(),
            cols = grid.cols,
            rows = grid.rows,
            %canvas,
            "collage"
        );

        // Decoding dominates; drawing order stays sequential.
        let handles: Vec<DrawableHandle> = images
            .par_iter()
            .map(|resource| self.decoder.decode(resource))
            .collect::<EngineResult<_>>()?;

        let mut surface = self.factory.allocate(canvas)?;
        surface.fill(background);
        for (index, handle) in handles.iter().enumerate() {
            let natural = handle.dimensions();
            surface.draw_image(handle, Rect::full(natural), grid.place(index, natural))?;
        }
        drop(handles);
        finish(
            &surface,
            MimeType::Jpeg,
            DERIVED_QUALITY,
            COLLAGE_NAME.to_string(),
            "create collage",
        )
    }

    /// Draw `text` over the image at the configured anchor.
    pub fn watermark(
        &self,
        resource: &ImageResource,
        text: &str,
        options: &WatermarkOptions,
    ) -> EngineResult<ImageResource> {
        let color = parse_color(&options.color)?;
        let handle = self.decoder.decode(resource)?;
        let size = handle.dimensions();
        let format = source_format(resource);

        let mut surface = self.factory.allocate(size)?;
        surface.draw_image(&handle, Rect::full(size), Placement::covering(size))?;
        drop(handle);

        let font = FontSpec::new(options.font_size as f64, options.font_family.clone());
        let text_width = surface.measure_text(text, &font);
        let (x, y) = watermark_anchor(
            text_width,
            font.size,
            size,
            options.position,
            options.padding as f64,
        );
        debug!(name = resource.name(), position = ?options.position, x, y, text_width, "watermark");
        surface.fill_text(text, x, y, &font, color);

        finish(
            &surface,
            format,
            DERIVED_QUALITY,
            resource.name().to_string(),
            "add watermark",
        )
    }

    // =========================================================================
    // ANALYSIS
    // =========================================================================

    /// Up to `count` most frequent quantized colors.
    pub fn dominant_colors(&self, resource: &ImageResource, count: usize) -> EngineResult<Vec<ColorSample>> {
        let handle = self.decoder.decode(resource)?;
        self.colors_of(&handle, count)
    }

    /// Natural size of the decoded image.
    pub fn dimensions(&self, resource: &ImageResource) -> EngineResult<Size> {
        Ok(self.decoder.decode(resource)?.dimensions())
    }

    /// Fresh descriptor; nothing is cached between calls.
    pub fn metadata(&self, resource: &ImageResource) -> EngineResult<ImageMetadata> {
        let handle = self.decoder.decode(resource)?;
        let dimensions = handle.dimensions();
        let colors = self.colors_of(&handle, METADATA_COLOR_COUNT)?;
        Ok(ImageMetadata::assemble(resource, dimensions, colors))
    }

    fn colors_of(&self, handle: &DrawableHandle, count: usize) -> EngineResult<Vec<ColorSample>> {
        let config = &self.config.color;
        let sample = Size::new(config.sample_width, config.sample_height);
        let mut surface = self.factory.allocate(sample)?;
        surface.draw_image(handle, Rect::full(handle.dimensions()), Placement::covering(sample))?;
        Ok(rank_colors(&surface.read_pixels(), config, count))
    }
}

/// Declared MIME if we can encode it, else PNG.
fn source_format(resource: &ImageResource) -> MimeType {
    match resource.mime().parse::<MimeType>() {
        Ok(format) => format,
        Err(_) => {
            warn!(
                name = resource.name(),
                mime = resource.mime(),
                "source MIME is not encodable, writing PNG"
            );
            MimeType::Png
        }
    }
}

fn finish<S: RasterSurface>(
    surface: &S,
    format: MimeType,
    quality: f32,
    name: String,
    operation: &'static str,
) -> EngineResult<ImageResource> {
    let bytes = surface
        .encode(format, quality)
        .map_err(|err| CanvasError::operation_failed(operation, err.to_string()))?;
    if bytes.is_empty() {
        return Err(CanvasError::operation_failed(operation, "encoder produced no output"));
    }
    debug!(operation, %format, bytes = bytes.len(), "encoded");
    Ok(ImageResource::new(bytes, format.as_str(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encoder::encode;
    use image::{DynamicImage, RgbaImage};

    fn png(width: u32, height: u32, color: [u8; 4]) -> ImageResource {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
        ImageResource::new(encode(&img, MimeType::Png, 1.0).unwrap(), "image/png", "photo.png")
    }

    fn decoded_size(resource: &ImageResource) -> (u32, u32) {
        let img = image::load_from_memory(resource.data()).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_resize_defaults_to_jpeg_and_keeps_name() {
        let pipeline = ImagePipeline::new();
        let out = pipeline
            .resize(&png(400, 200, [10, 20, 30, 255]), &ResizeOptions::bounds(100, 100))
            .unwrap();
        assert_eq!(out.mime(), "image/jpeg");
        assert_eq!(out.name(), "photo.png");
        assert_eq!(decoded_size(&out), (100, 50));
    }

    #[test]
    fn test_resize_rejects_zero_bounds() {
        let err = ImagePipeline::new()
            .resize(&png(4, 4, [0; 4]), &ResizeOptions::bounds(0, 10))
            .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidResizeDimensions { .. }));
    }

    #[test]
    fn test_thumbnail_is_square_bounded() {
        let out = ImagePipeline::new()
            .thumbnail(&png(300, 600, [0, 0, 0, 255]), DEFAULT_THUMBNAIL_SIZE)
            .unwrap();
        assert_eq!(decoded_size(&out), (75, 150));
        assert_eq!(out.mime(), "image/jpeg");
    }

    #[test]
    fn test_crop_keeps_source_mime() {
        let out = ImagePipeline::new()
            .crop(&png(50, 50, [5, 5, 5, 255]), &CropOptions::new(10, 10, 20, 15))
            .unwrap();
        assert_eq!(out.mime(), "image/png");
        assert_eq!(decoded_size(&out), (20, 15));
    }

    #[test]
    fn test_crop_with_unknown_mime_writes_png() {
        let bytes = png(8, 8, [1, 2, 3, 255]).data().to_vec();
        let source = ImageResource::new(bytes, "image/x-unknown", "odd.bin");
        let out = ImagePipeline::new().crop(&source, &CropOptions::new(0, 0, 4, 4)).unwrap();
        assert_eq!(out.mime(), "image/png");
    }

    #[test]
    fn test_convert_to_png_flattens_on_white() {
        let out = ImagePipeline::new()
            .convert_format(&png(4, 4, [0, 0, 0, 0]), MimeType::Png)
            .unwrap();
        assert_eq!(out.name(), "photo.png");
        let px = image::load_from_memory(out.data()).unwrap().to_rgba8();
        assert_eq!(px.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_convert_renames_extension() {
        let out = ImagePipeline::new()
            .convert_format(&png(4, 4, [9, 9, 9, 255]), MimeType::WebP)
            .unwrap();
        assert_eq!(out.name(), "photo.webp");
        assert_eq!(out.mime(), "image/webp");
    }

    #[test]
    fn test_collage_is_fixed_jpeg() {
        let images = vec![png(10, 10, [255, 0, 0, 255]), png(20, 10, [0, 255, 0, 255])];
        let out = ImagePipeline::new()
            .collage(&images, &CollageOptions::default())
            .unwrap();
        assert_eq!((out.name(), out.mime()), (COLLAGE_NAME, "image/jpeg"));
        assert_eq!(decoded_size(&out), (800, 600));
    }

    #[test]
    fn test_collage_rejects_bad_background() {
        let options = CollageOptions {
            background_color: "chartreuse-ish".to_string(),
            ..CollageOptions::default()
        };
        let err = ImagePipeline::new()
            .collage(&[png(2, 2, [0; 4])], &options)
            .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidColor { .. }));
    }

    #[test]
    fn test_dominant_colors_of_uniform_image() {
        let colors = ImagePipeline::new()
            .dominant_colors(&png(30, 20, [122, 41, 69, 255]), 5)
            .unwrap();
        assert_eq!(colors, vec![ColorSample::from_rgb([120, 40, 70])]);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let junk = ImageResource::new(vec![1, 2, 3, 4, 5], "image/png", "junk.png");
        let err = ImagePipeline::new().compress(&junk, 0.5).unwrap_err();
        assert!(matches!(err, CanvasError::DecodeFailed { .. }));
        assert!(err.to_string().starts_with("Failed to load image"));
    }
}
