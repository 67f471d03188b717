// src/engine/resample.rs
//
// RGBA resampling for surface draws.
// fast_image_resize (SIMD, Lanczos3) first, image crate resize as fallback.

use crate::engine::common::EngineResult;
use crate::error::CanvasError;
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::imageops::FilterType;
use image::RgbaImage;

/// Above this many pixels the source is scanned for opacity before premultiplying.
const OPAQUE_SCAN_THRESHOLD: u64 = 1_000_000;

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Resample `src` to exactly `dst_width` x `dst_height`.
pub fn resize_rgba(src: RgbaImage, dst_width: u32, dst_height: u32) -> EngineResult<RgbaImage> {
    let (src_width, src_height) = src.dimensions();
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(resample_error(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }
    if (src_width, src_height) == (dst_width, dst_height) {
        return Ok(src);
    }

    let mut src_pixels = src.into_raw();
    let primary = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        PixelType::U8x4,
    ) {
        Ok(src_image) => resize_with_source_image(src_image, dst_width, dst_height),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            copy_pixels_to_aligned_image(src_width, src_height, &src_pixels)
                .and_then(|aligned| resize_with_source_image(aligned, dst_width, dst_height))
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    match primary {
        Ok(img) => Ok(img),
        Err(err) => {
            tracing::debug!(error = %err, "fast resize failed, falling back to image crate");
            resize_with_image_crate_fallback(src_pixels, src_width, src_height, dst_width, dst_height)
                .map_err(|fallback_err| {
                    resample_error(
                        (src_width, src_height),
                        (dst_width, dst_height),
                        format!("{err}; image crate fallback failed: {fallback_err}"),
                    )
                })
        }
    }
}

fn resample_error(src: (u32, u32), dst: (u32, u32), reason: impl std::fmt::Display) -> CanvasError {
    CanvasError::internal_panic(format!(
        "resize {}x{} -> {}x{}: {reason}",
        src.0, src.1, dst.0, dst.1
    ))
}

fn copy_pixels_to_aligned_image(
    width: u32,
    height: u32,
    src_pixels: &[u8],
) -> Result<fir::images::Image<'static>, String> {
    let mut aligned_image = fir::images::Image::new(width, height, PixelType::U8x4);
    let aligned_buffer = aligned_image.buffer_mut();
    if aligned_buffer.len() != src_pixels.len() {
        return Err(format!(
            "fir alignment fallback buffer mismatch. expected {} bytes, got {} bytes",
            src_pixels.len(),
            aligned_buffer.len()
        ));
    }
    aligned_buffer.copy_from_slice(src_pixels);
    Ok(aligned_image)
}

fn resize_with_image_crate_fallback(
    src_pixels: Vec<u8>,
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Result<RgbaImage, String> {
    let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels)
        .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
    Ok(image::imageops::resize(
        &rgba,
        dst_width,
        dst_height,
        FilterType::Lanczos3,
    ))
}

/// Small images are assumed translucent; premultiplying them costs less than the scan.
fn is_fully_opaque(image: &fir::images::Image) -> bool {
    let pixels = image.width() as u64 * image.height() as u64;
    if pixels < OPAQUE_SCAN_THRESHOLD {
        return false;
    }
    image.buffer().iter().skip(3).step_by(4).all(|&alpha| alpha == 255)
}

fn resize_with_source_image(
    mut src_image: fir::images::Image<'_>,
    dst_width: u32,
    dst_height: u32,
) -> Result<RgbaImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8x4);
    let needs_premultiply = !is_fully_opaque(&src_image);

    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &default_resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    RgbaImage::from_raw(dst_width, dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to create rgba image from resized data".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_downscale_hits_exact_size() {
        let src = RgbaImage::from_pixel(40, 30, Rgba([10, 20, 30, 255]));
        let out = resize_rgba(src, 13, 7).unwrap();
        assert_eq!(out.dimensions(), (13, 7));
        assert_eq!(out.get_pixel(6, 3).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_upscale_hits_exact_size() {
        let src = RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 255]));
        let out = resize_rgba(src, 9, 5).unwrap();
        assert_eq!(out.dimensions(), (9, 5));
    }

    #[test]
    fn test_same_size_is_passthrough() {
        let src = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let out = resize_rgba(src.clone(), 4, 4).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_transparent_pixels_do_not_bleed_color() {
        // Half opaque red, half fully transparent green. Premultiplication keeps
        // the green out of the blended edge.
        let src = RgbaImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 255, 0, 0])
            }
        });
        let out = resize_rgba(src, 10, 10).unwrap();
        for x in 0..10 {
            let px = out.get_pixel(x, 5);
            if px[3] > 32 {
                assert!(px[1] < 32, "green bled into visible pixel at x={x}: {px:?}");
            }
        }
    }

    #[test]
    fn test_zero_target_rejected() {
        let src = RgbaImage::new(4, 4);
        assert!(resize_rgba(src, 0, 4).is_err());
    }
}
