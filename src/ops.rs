// src/ops.rs
//
// Plain option records for every transform, plus output formats and colors.
// These are cheap to create and clone - the expensive work happens in the engine.

use crate::error::CanvasError;
use image::{ImageFormat, Rgba};
use std::fmt;
use std::str::FromStr;

/// Quality used when a caller-supplied quality is outside `0.0..=1.0`.
pub const FALLBACK_QUALITY: f32 = 0.92;

/// Encodable output formats, named by MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MimeType {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl MimeType {
    pub const ALL: [MimeType; 4] = [Self::Jpeg, Self::Png, Self::WebP, Self::Gif];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Human label used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
            Self::Gif => "GIF",
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

impl FromStr for MimeType {
    type Err = CanvasError;

    /// Accepts full MIME types (`image/jpeg`) and bare names (`jpg`, `png`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("image/").unwrap_or(&normalized);
        match name {
            "jpeg" | "jpg" | "pjpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            _ => Err(CanvasError::unsupported_format(value.to_string())),
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a `0.0..=1.0` quality into the 1-100 scale the codecs take.
pub fn quality_percent(quality: f32) -> u8 {
    let q = if quality.is_finite() && (0.0..=1.0).contains(&quality) {
        quality
    } else {
        FALLBACK_QUALITY
    };
    ((q * 100.0).round() as u8).clamp(1, 100)
}

// =============================================================================
// OPERATION OPTIONS
// =============================================================================

/// Options for `resize`. Defaults: 1920x1080 bounds, JPEG at 0.8.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: f32,
    pub format: MimeType,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 0.8,
            format: MimeType::Jpeg,
        }
    }
}

impl ResizeOptions {
    pub fn bounds(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            ..Self::default()
        }
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn format(mut self, format: MimeType) -> Self {
        self.format = format;
        self
    }
}

/// Source rectangle for `crop`, in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropOptions {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropOptions {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Options for `collage`. Defaults: 800x600 canvas, 10px padding, white background.
#[derive(Clone, Debug, PartialEq)]
pub struct CollageOptions {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub background_color: String,
}

impl Default for CollageOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding: 10,
            background_color: "#ffffff".to_string(),
        }
    }
}

/// Where the watermark text is anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    /// Unrecognized names fall back to `BottomRight`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "center" => Self::Center,
            _ => Self::BottomRight,
        }
    }
}

/// Options for `watermark`.
#[derive(Clone, Debug, PartialEq)]
pub struct WatermarkOptions {
    pub font_size: u32,
    pub font_family: String,
    pub color: String,
    pub position: WatermarkPosition,
    pub padding: u32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            font_size: 24,
            font_family: "Arial".to_string(),
            color: "rgba(255, 255, 255, 0.5)".to_string(),
            position: WatermarkPosition::BottomRight,
            padding: 20,
        }
    }
}

// =============================================================================
// COLORS
// =============================================================================

/// Parse any CSS color string: hex, `rgb()`/`rgba()`, `hsl()`/`hwb()` or a named color.
pub fn parse_color(input: &str) -> Result<Rgba<u8>, CanvasError> {
    csscolorparser::parse(input.trim())
        .map(|color| Rgba(color.to_rgba8()))
        .map_err(|_| CanvasError::invalid_color(input.to_string()))
}
