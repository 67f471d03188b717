// src/engine/surface.rs
//
// Raster surfaces: the drawing target every transform renders into.
//
// Operations never touch pixels directly. They ask a SurfaceFactory for a
// surface, draw decoded handles and text into it, then read pixels back or
// encode it. The default factory renders with the image crate; tests inject
// their own to observe draw calls.

use crate::engine::common::EngineResult;
use crate::engine::decoder::DrawableHandle;
use crate::engine::encoder;
use crate::engine::geometry::{Placement, Rect, Size};
use crate::engine::resample::resize_rgba;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::CanvasError;
use crate::ops::MimeType;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, DynamicImage, Pixel, Rgba, RgbaImage};

/// Font request for text drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    /// Pixel size of the em box.
    pub size: f64,
    /// Requested family. Surfaces without font lookup may ignore it.
    pub family: String,
}

impl FontSpec {
    pub fn new(size: f64, family: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
        }
    }
}

/// A writable 2-D RGBA raster.
pub trait RasterSurface: Send {
    fn size(&self) -> Size;

    /// Paint every pixel with `color`, replacing what was there.
    fn fill(&mut self, color: Rgba<u8>);

    /// Draw region `src` of `image`, scaled into `dst`. Parts of `src` outside
    /// the image contribute transparent pixels.
    fn draw_image(&mut self, image: &DrawableHandle, src: Rect, dst: Placement) -> EngineResult<()>;

    /// Advance width of `text` in pixels.
    fn measure_text(&self, text: &str, font: &FontSpec) -> f64;

    /// Draw `text` with its baseline-bottom origin at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &FontSpec, color: Rgba<u8>);

    /// Copy of the current pixels.
    fn read_pixels(&self) -> RgbaImage;

    /// Encode the current pixels. `quality` is in `0.0..=1.0` and ignored by lossless formats.
    fn encode(&self, format: MimeType, quality: f32) -> EngineResult<Vec<u8>>;
}

/// Allocates surfaces. Shared across threads by the pipeline.
pub trait SurfaceFactory: Send + Sync {
    type Surface: RasterSurface;

    /// A fully transparent surface of `size`.
    fn allocate(&self, size: Size) -> EngineResult<Self::Surface>;
}

/// Reject surfaces that are empty or larger than the decode limits.
pub fn check_surface_size(size: Size) -> EngineResult<()> {
    if size.width == 0 || size.height == 0 {
        return Err(CanvasError::invalid_argument(
            "surface",
            size.to_string(),
            "width and height must be positive",
        ));
    }
    let largest = size.width.max(size.height);
    if largest > MAX_DIMENSION {
        return Err(CanvasError::dimension_exceeds_limit(largest, MAX_DIMENSION));
    }
    if size.pixels() > MAX_PIXELS {
        return Err(CanvasError::pixel_count_exceeds_limit(size.pixels(), MAX_PIXELS));
    }
    Ok(())
}

// =============================================================================
// DEFAULT SURFACE
// =============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageSurfaceFactory;

impl SurfaceFactory for ImageSurfaceFactory {
    type Surface = ImageSurface;

    fn allocate(&self, size: Size) -> EngineResult<ImageSurface> {
        check_surface_size(size)?;
        Ok(ImageSurface {
            canvas: RgbaImage::new(size.width, size.height),
        })
    }
}

/// Surface backed by an `RgbaImage`.
#[derive(Clone, Debug)]
pub struct ImageSurface {
    canvas: RgbaImage,
}

impl ImageSurface {
    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }
}

/// Integer scale for the 8x8 bitmap face at `font_size`. Saturates for huge sizes.
fn glyph_scale(font_size: f64) -> i64 {
    if font_size.is_finite() {
        ((font_size / 8.0).round() as i64).clamp(1, i64::from(u32::MAX))
    } else {
        1
    }
}

fn glyph_for(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Source-over with exact results for fully opaque and fully transparent sources.
fn blend_pixel(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    match src[3] {
        0 => {}
        255 => *dst = *src,
        _ => dst.blend(src),
    }
}

fn composite_over(canvas: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64) {
    let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);
    for (tx, ty, px) in top.enumerate_pixels() {
        let (cx, cy) = (x + tx as i64, y + ty as i64);
        if cx < 0 || cy < 0 || cx >= canvas_w || cy >= canvas_h {
            continue;
        }
        blend_pixel(canvas.get_pixel_mut(cx as u32, cy as u32), px);
    }
}

/// Pixels of `src` inside `image`; out-of-range parts stay transparent.
fn extract_region(image: &DynamicImage, src: Rect) -> RgbaImage {
    let bounds = Size::new(image.width(), image.height());
    if src.fits_within(bounds) {
        return image.crop_imm(src.x, src.y, src.width, src.height).to_rgba8();
    }
    let mut region = RgbaImage::new(src.width, src.height);
    imageops::replace(&mut region, &image.to_rgba8(), -(src.x as i64), -(src.y as i64));
    region
}

impl RasterSurface for ImageSurface {
    fn size(&self) -> Size {
        Size::new(self.canvas.width(), self.canvas.height())
    }

    fn fill(&mut self, color: Rgba<u8>) {
        for px in self.canvas.pixels_mut() {
            *px = color;
        }
    }

    fn draw_image(&mut self, image: &DrawableHandle, src: Rect, dst: Placement) -> EngineResult<()> {
        if src.width == 0 || src.height == 0 {
            return Err(CanvasError::invalid_crop_dimensions(src.width, src.height));
        }
        let (x, y, target) = dst.to_pixels();
        let region = extract_region(image.image(), src);
        let scaled = resize_rgba(region, target.width, target.height)?;
        composite_over(&mut self.canvas, &scaled, x, y);
        Ok(())
    }

    fn measure_text(&self, text: &str, font: &FontSpec) -> f64 {
        let count = text.chars().count() as f64;
        if count == 0.0 {
            return 0.0;
        }
        let scale = glyph_scale(font.size) as f64;
        count * 8.0 * scale + (count - 1.0) * scale
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &FontSpec, color: Rgba<u8>) {
        let scale = glyph_scale(font.size);
        let advance = scale.saturating_mul(9);
        let (width, height) = (i64::from(self.canvas.width()), i64::from(self.canvas.height()));
        let top = (y.round() as i64).saturating_sub(scale.saturating_mul(8));
        let mut cursor = x.round() as i64;

        for ch in text.chars() {
            if cursor >= width {
                break;
            }
            // Each lit bit is a scale x scale block; only its on-canvas part is visited.
            if cursor.saturating_add(scale.saturating_mul(8)) > 0 {
                for (row, bits) in glyph_for(ch).iter().enumerate() {
                    let block_top = top.saturating_add((row as i64).saturating_mul(scale));
                    let rows = block_top.max(0)..block_top.saturating_add(scale).min(height);
                    if rows.is_empty() {
                        continue;
                    }
                    for col in 0..8i64 {
                        if (*bits >> col) & 1 == 0 {
                            continue;
                        }
                        let block_left = cursor.saturating_add(col.saturating_mul(scale));
                        let cols = block_left.max(0)..block_left.saturating_add(scale).min(width);
                        for py in rows.clone() {
                            for px in cols.clone() {
                                blend_pixel(self.canvas.get_pixel_mut(px as u32, py as u32), &color);
                            }
                        }
                    }
                }
            }
            cursor = cursor.saturating_add(advance);
        }
    }

    fn read_pixels(&self) -> RgbaImage {
        self.canvas.clone()
    }

    fn encode(&self, format: MimeType, quality: f32) -> EngineResult<Vec<u8>> {
        encoder::encode_rgba(&self.canvas, format, quality)
    }
}
