// src/engine/geometry.rs
//
// Geometry planner: pure functions that decide where pixels go.
// No I/O, no allocation beyond the returned values.

use crate::engine::common::EngineResult;
use crate::error::CanvasError;
use crate::ops::{CropOptions, WatermarkPosition};
use std::fmt;
use std::str::FromStr;

/// Width and height in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `size`-sized image.
    pub const fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Whether the rect lies entirely inside `(0, 0, bounds)`.
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.x as u64 + self.width as u64 <= bounds.width as u64
            && self.y as u64 + self.height as u64 <= bounds.height as u64
    }

    /// Clamp this rect to fit within `(0, 0, max_w, max_h)`.
    /// Width and height are clamped to at least 1.
    pub fn clamp_to(self, max_w: u32, max_h: u32) -> Self {
        let x = self.x.min(max_w.saturating_sub(1));
        let y = self.y.min(max_h.saturating_sub(1));
        let w = self.width.min(max_w.saturating_sub(x)).max(1);
        let h = self.height.min(max_h.saturating_sub(y)).max(1);
        Self::new(x, y, w, h)
    }
}

/// Sub-pixel destination box. Rounded to whole pixels when drawn.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Placement covering `(0, 0, size)`.
    pub fn covering(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width as f64, size.height as f64)
    }

    /// Rounded origin and size; size is at least 1x1.
    pub fn to_pixels(&self) -> (i64, i64, Size) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            Size::new(
                (self.width.round().max(1.0)) as u32,
                (self.height.round().max(1.0)) as u32,
            ),
        )
    }
}

// =============================================================================
// ASPECT-FIT SCALING
// =============================================================================

/// Largest box with the source aspect ratio inside `(max_w, max_h)`, never upscaling.
///
/// Clamps width first, then height. The order matters for sources wider than
/// both bounds: 4000x3000 into 1920x1080 goes 1920x1440 then 1440x1080.
pub fn fit_within_f64(width: f64, height: f64, max_w: f64, max_h: f64) -> (f64, f64) {
    let aspect_ratio = width / height;
    let (mut w, mut h) = (width, height);
    if w > max_w {
        w = max_w;
        h = w / aspect_ratio;
    }
    if h > max_h {
        h = max_h;
        w = h * aspect_ratio;
    }
    (w, h)
}

/// Integer variant of [`fit_within_f64`]: rounded, at least 1px per side.
pub fn fit_within(source: Size, max_w: u32, max_h: u32) -> Size {
    if source.width == 0 || source.height == 0 {
        return source;
    }
    let (w, h) = fit_within_f64(
        source.width as f64,
        source.height as f64,
        max_w as f64,
        max_h as f64,
    );
    Size::new((w.round() as u32).max(1), (h.round() as u32).max(1))
}

// =============================================================================
// CROP PLANNING
// =============================================================================

/// What to do with a crop rectangle that leaves the source bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CropPolicy {
    /// Reject with `InvalidCropBounds`.
    #[default]
    Strict,
    /// Clamp to the source and log a warning.
    Clamp,
    /// Use the rectangle as given; uncovered areas come out transparent.
    Verbatim,
}

impl FromStr for CropPolicy {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" | "reject" => Ok(Self::Strict),
            "clamp" => Ok(Self::Clamp),
            "verbatim" | "unclamped" => Ok(Self::Verbatim),
            other => Err(CanvasError::invalid_argument(
                "crop_policy",
                other.to_string(),
                "Expected strict, clamp, or verbatim",
            )),
        }
    }
}

/// Resolve the source rectangle for a crop.
pub fn plan_crop(crop: &CropOptions, source: Size, policy: CropPolicy) -> EngineResult<Rect> {
    if crop.width == 0 || crop.height == 0 {
        return Err(CanvasError::invalid_crop_dimensions(crop.width, crop.height));
    }
    let rect = Rect::new(crop.x, crop.y, crop.width, crop.height);
    if rect.fits_within(source) {
        return Ok(rect);
    }

    let out_of_bounds = || {
        CanvasError::invalid_crop_bounds(
            crop.x,
            crop.y,
            crop.width,
            crop.height,
            source.width,
            source.height,
        )
    };
    match policy {
        CropPolicy::Strict => Err(out_of_bounds()),
        CropPolicy::Clamp => {
            if crop.x >= source.width || crop.y >= source.height {
                return Err(out_of_bounds());
            }
            let clamped = rect.clamp_to(source.width, source.height);
            tracing::warn!(
                requested = ?rect,
                clamped = ?clamped,
                source = %source,
                "crop rectangle clamped to source bounds"
            );
            Ok(clamped)
        }
        CropPolicy::Verbatim => Ok(rect),
    }
}

// =============================================================================
// GRID LAYOUT
// =============================================================================

/// Grid for an N-image collage: `ceil(sqrt(N))` columns, `ceil(N / cols)` rows.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub padding: f64,
}

impl GridLayout {
    pub fn plan(count: usize, canvas: Size, padding: u32) -> EngineResult<Self> {
        if count == 0 {
            return Err(CanvasError::empty_collage());
        }
        let cols = (count as f64).sqrt().ceil() as u32;
        let rows = (count as u32).div_ceil(cols);
        let pad = padding as f64;
        let cell_width = (canvas.width as f64 - pad * (cols as f64 + 1.0)) / cols as f64;
        let cell_height = (canvas.height as f64 - pad * (rows as f64 + 1.0)) / rows as f64;

        if cell_width <= 0.0 || cell_height <= 0.0 {
            return Err(CanvasError::invalid_argument(
                "padding",
                padding.to_string(),
                format!("leaves no room for a {cols}x{rows} grid on a {canvas} canvas"),
            ));
        }

        Ok(Self {
            cols,
            rows,
            cell_width,
            cell_height,
            padding: pad,
        })
    }

    pub fn capacity(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// `(row, col)` of the image at `index`, filled row by row.
    pub fn cell_of(&self, index: usize) -> (u32, u32) {
        let cols = self.cols as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    /// The full cell box at `index`.
    pub fn cell(&self, index: usize) -> Placement {
        let (row, col) = self.cell_of(index);
        Placement::new(
            self.padding + col as f64 * (self.cell_width + self.padding),
            self.padding + row as f64 * (self.cell_height + self.padding),
            self.cell_width,
            self.cell_height,
        )
    }

    /// Aspect-fit `image` into its cell and center it.
    pub fn place(&self, index: usize, image: Size) -> Placement {
        let cell = self.cell(index);
        let scale = (cell.width / image.width as f64).min(cell.height / image.height as f64);
        let width = image.width as f64 * scale;
        let height = image.height as f64 * scale;
        Placement::new(
            cell.x + (cell.width - width) / 2.0,
            cell.y + (cell.height - height) / 2.0,
            width,
            height,
        )
    }
}

// =============================================================================
// WATERMARK ANCHOR
// =============================================================================

/// Baseline-bottom origin for watermark text of `text_width` at `font_size`.
pub fn watermark_anchor(
    text_width: f64,
    font_size: f64,
    canvas: Size,
    position: WatermarkPosition,
    padding: f64,
) -> (f64, f64) {
    let w = canvas.width as f64;
    let h = canvas.height as f64;
    match position {
        WatermarkPosition::TopLeft => (padding, padding + font_size),
        WatermarkPosition::TopRight => (w - text_width - padding, padding + font_size),
        WatermarkPosition::BottomLeft => (padding, h - padding),
        WatermarkPosition::BottomRight => (w - text_width - padding, h - padding),
        WatermarkPosition::Center => ((w - text_width) / 2.0, (h + font_size) / 2.0),
    }
}
