// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), WebP (libwebp), GIF (image crate).
// Quality arrives as 0.0..=1.0 like a canvas toBlob call and is mapped to 1..=100.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::MAX_DIMENSION;
use crate::error::CanvasError;
use crate::ops::{quality_percent, MimeType};
use image::buffer::ConvertBuffer;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;
use std::io::Cursor;

/// Derives per-codec knobs from a 0-100 quality.
/// Bands:
/// - High (>=85): favor visual quality
/// - Balanced (70-84)
/// - Fast (<70): favor speed and size
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100) as f32,
        }
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else {
            QualityBand::Fast
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 90.0 {
            0
        } else if self.quality >= 70.0 {
            5
        } else if self.quality >= 60.0 {
            10
        } else {
            18
        }
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast => 0,
        }
    }
}

/// Encode a decoded image as `format`. `quality` is ignored by lossless formats.
pub fn encode(img: &DynamicImage, format: MimeType, quality: f32) -> EngineResult<Vec<u8>> {
    match format {
        MimeType::Jpeg => encode_jpeg(img, quality_percent(quality)),
        MimeType::Png => encode_png(img),
        MimeType::WebP => encode_webp(img, quality_percent(quality)),
        MimeType::Gif => encode_gif(img),
    }
}

/// Same as [`encode`], borrowing an RGBA surface buffer instead of a `DynamicImage`.
pub fn encode_rgba(img: &RgbaImage, format: MimeType, quality: f32) -> EngineResult<Vec<u8>> {
    match format {
        MimeType::Jpeg => {
            let rgb: RgbImage = img.convert();
            jpeg_from_rgb(&rgb, quality_percent(quality))
        }
        MimeType::Png => run_with_panic_policy("encode:png", || {
            optimize_png(&write_buffer(img, ImageFormat::Png, "png")?)
        }),
        MimeType::WebP => webp_from_rgba(img, quality_percent(quality)),
        MimeType::Gif => run_with_panic_policy("encode:gif", || write_buffer(img, ImageFormat::Gif, "gif")),
    }
}

/// Encode to JPEG using mozjpeg. Alpha is dropped, as a canvas does for JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    let rgb: Cow<'_, RgbImage> = match img {
        DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
        _ => Cow::Owned(img.to_rgb8()),
    };
    jpeg_from_rgb(&rgb, quality)
}

fn jpeg_from_rgb(rgb: &RgbImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(CanvasError::encode_failed(
                "jpeg",
                "width or height is zero",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(CanvasError::dimension_exceeds_limit(w.max(h), MAX_DIMENSION));
        }

        let settings = QualitySettings::new(quality);
        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(settings.quality());
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);
        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                CanvasError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    CanvasError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                CanvasError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        Ok(output)
    })
}

/// Encode to PNG with the image crate, then recompress losslessly with oxipng.
pub fn encode_png(img: &DynamicImage) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| CanvasError::encode_failed("png", format!("PNG encode failed: {e}")))?;
        optimize_png(&buf)
    })
}

fn optimize_png(png: &[u8]) -> EngineResult<Vec<u8>> {
    let mut options = oxipng::Options::from_preset(2);
    options.strip = oxipng::StripChunks::None;

    oxipng::optimize_from_memory(png, &options).map_err(|e| {
        CanvasError::encode_failed("png", format!("oxipng optimization failed: {e}"))
    })
}

/// Encode to lossy WebP with libwebp.
pub fn encode_webp(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    match img {
        DynamicImage::ImageRgba8(rgba) => webp_from_rgba(rgba, quality),
        _ => webp_from_rgba(&img.to_rgba8(), quality),
    }
}

fn webp_from_rgba(rgba: &RgbaImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let (w, h) = rgba.dimensions();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), w, h);

        let mut config = webp::WebPConfig::new()
            .map_err(|_| CanvasError::internal_panic("failed to create WebPConfig"))?;

        let settings = QualitySettings::new(quality);
        config.quality = settings.quality();
        config.method = 4;
        config.pass = 1;
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let mem = encoder.encode_advanced(&config).map_err(|e| {
            CanvasError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
        })?;
        Ok(mem.to_vec())
    })
}

/// Encode to GIF (palette quantized by the image crate).
pub fn encode_gif(img: &DynamicImage) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:gif", || match img {
        DynamicImage::ImageRgba8(rgba) => write_buffer(rgba, ImageFormat::Gif, "gif"),
        _ => write_buffer(&img.to_rgba8(), ImageFormat::Gif, "gif"),
    })
}

fn write_buffer(img: &RgbaImage, format: ImageFormat, label: &'static str) -> EngineResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).map_err(|e| {
        CanvasError::encode_failed(label, format!("{} encode failed: {e}", label.to_uppercase()))
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90, 255])
        }))
    }

    #[test]
    fn test_every_format_round_trips_through_image_crate() {
        let img = sample(12, 9);
        for format in MimeType::ALL {
            let bytes = encode(&img, format, 0.9).unwrap();
            assert!(!bytes.is_empty(), "{format} produced no bytes");
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (12, 9), "{format}");
        }
    }

    #[test]
    fn test_jpeg_signature_and_quality_affects_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([((x * y) % 256) as u8, (x * 3 % 256) as u8, (y * 11 % 256) as u8, 255])
        }));
        let low = encode_jpeg(&img, 20).unwrap();
        let high = encode_jpeg(&img, 95).unwrap();
        assert_eq!(&low[..2], &[0xFF, 0xD8]);
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 40])));
        let bytes = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 1).0, [1, 2, 3, 40]);
    }

    #[test]
    fn test_borrowed_rgba_encodes_every_format() {
        let img = sample(10, 7);
        let rgba = img.to_rgba8();
        for format in MimeType::ALL {
            let bytes = encode_rgba(&rgba, format, 0.9).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (10, 7), "{format}");
        }
        let png = encode_rgba(&rgba, MimeType::Png, 1.0).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, rgba);
    }

    #[test]
    fn test_quality_bands() {
        assert_eq!(QualitySettings::new(90).webp_filter_sharpness(), 2);
        assert_eq!(QualitySettings::new(75).webp_sns_strength(), 70);
        assert_eq!(QualitySettings::new(10).jpeg_smoothing(), 18);
        assert_eq!(QualitySettings::new(250).quality(), 100.0);
    }
}
