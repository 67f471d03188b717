// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), PNG (zune-png), WebP (libwebp), others via image crate.
// Every decode holds a SourceBinding for exactly the duration of the call.

use crate::engine::binding::{BindingRegistry, SourceBinding};
use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::geometry::Size;
use crate::engine::resource::ImageResource;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::CanvasError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader,
    RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use std::sync::Arc;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

/// Overhead for decoder scratch buffers, added to every binding weight.
const DECODE_OVERHEAD_BYTES: u64 = 8 * 1024 * 1024;

/// A decoded image ready to be drawn.
#[derive(Clone, Debug)]
pub struct DrawableHandle {
    image: DynamicImage,
    format: Option<ImageFormat>,
}

impl DrawableHandle {
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
        }
    }

    pub fn natural_width(&self) -> u32 {
        self.image.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    /// Container format detected from magic bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Turns ImageResources into DrawableHandles under a shared binding budget.
#[derive(Clone, Debug)]
pub struct Decoder {
    registry: Arc<BindingRegistry>,
}

impl Decoder {
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            registry: BindingRegistry::new(budget_bytes),
        }
    }

    pub fn with_registry(registry: Arc<BindingRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Bind the resource, decode it, release the binding, then return.
    ///
    /// The binding never outlives this call, whatever path it takes out.
    pub fn decode(&self, resource: &ImageResource) -> EngineResult<DrawableHandle> {
        if resource.is_empty() {
            return Err(CanvasError::decode_failed("image data is empty"));
        }

        let binding: SourceBinding = self.registry.bind(estimate_decoded_bytes(resource.data()));
        tracing::trace!(
            name = resource.name(),
            bytes = resource.size(),
            weight = binding.weight(),
            "bound source for decode"
        );
        let decoded = ensure_dimensions_safe(resource.data())
            .and_then(|()| decode_image(resource.data()));
        drop(binding);

        let (image, format) = decoded.map_err(into_load_error)?;
        Ok(DrawableHandle { image, format })
    }
}

/// Keep limit errors as-is; everything else is a load failure.
fn into_load_error(err: CanvasError) -> CanvasError {
    match err {
        CanvasError::DecodeFailed { .. }
        | CanvasError::DimensionExceedsLimit { .. }
        | CanvasError::PixelCountExceedsLimit { .. } => err,
        CanvasError::InternalPanic { message } => CanvasError::decode_failed(message),
        other => CanvasError::decode_failed(other.to_string()),
    }
}

/// Header-only estimate of decoded RGBA size, used as the binding weight.
pub fn estimate_decoded_bytes(bytes: &[u8]) -> u64 {
    let pixels = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .map(|(w, h)| w as u64 * h as u64)
        .unwrap_or(0);
    pixels.saturating_mul(4).saturating_add(DECODE_OVERHEAD_BYTES)
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(CanvasError::decode_failed("mozjpeg: missing JPEG EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(CanvasError::dimension_exceeds_limit(
                width.max(height) as u32,
                MAX_DIMENSION,
            ));
        }
        let width_u32 = width as u32;
        let height_u32 = height as u32;
        check_dimensions(width_u32, height_u32)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width_u32, height_u32, flat_pixels).ok_or_else(|| {
            CanvasError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode formats without a dedicated fast path (GIF and friends).
pub fn decode_with_image_crate(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| CanvasError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(data, options);
        let pixels = decoder
            .decode()
            .map_err(|e| CanvasError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .get_info()
            .ok_or_else(|| CanvasError::decode_failed("png: missing header info"))?;

        let width = info.width as u32;
        let height = info.height as u32;
        check_dimensions(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(CanvasError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .get_colorspace()
            .ok_or_else(|| CanvasError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA => RgbaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build RGBA image"))?,
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(CanvasError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        Ok(img)
    })
}

/// Decode WebP using libwebp. Falls back to the image crate for animated WebP.
pub fn decode_webp_libwebp(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data).ok_or_else(|| {
            CanvasError::decode_failed("webp: failed to read bitstream features")
        })?;

        if features.has_animation() {
            return image::load_from_memory(data).map_err(|e| {
                CanvasError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| CanvasError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint: detect once, route to the fastest decoder.
pub fn decode_image(bytes: &[u8]) -> EngineResult<(DynamicImage, Option<ImageFormat>)> {
    let detected = detect_format(bytes);
    tracing::trace!(format = ?detected, "routing decode");
    let img = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::Png) => decode_png_zune(bytes)?,
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes)?,
        Some(_) => decode_with_image_crate(bytes)?,
        None => {
            return Err(CanvasError::decode_failed(
                "unrecognized image data (no known magic bytes)",
            ))
        }
    };
    Ok((img, detected))
}

/// Reject images too large to decode safely (decompression bombs).
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(CanvasError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(CanvasError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<()> {
    if let Ok(reader) = ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}
