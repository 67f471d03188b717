// src/engine/color.rs
//
// Dominant color analysis over a downscaled RGBA sample.

use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;

/// Tuning for dominant color extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorAnalyzerConfig {
    /// Sample surface width. The source is drawn stretched into it.
    pub sample_width: u32,
    pub sample_height: u32,
    /// Channels are rounded to the nearest multiple of this.
    pub bucket_size: u8,
    /// Pixels with alpha below this are skipped.
    pub alpha_threshold: u8,
}

impl Default for ColorAnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_width: 100,
            sample_height: 100,
            bucket_size: 10,
            alpha_threshold: 128,
        }
    }
}

/// One ranked color, formatted for CSS.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorSample {
    /// `rgb(r, g, b)`
    pub rgb: String,
    /// `#rrggbb`, lowercase
    pub hex: String,
}

impl ColorSample {
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        Self {
            rgb: format!("rgb({r}, {g}, {b})"),
            hex: format!("#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl fmt::Display for ColorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Round `value` to the nearest multiple of `bucket`, halves rounding up, capped at 255.
pub fn quantize_channel(value: u8, bucket: u8) -> u8 {
    if bucket <= 1 {
        return value;
    }
    let bucket = bucket as u32;
    let rounded = (value as u32 + bucket / 2) / bucket * bucket;
    rounded.min(255) as u8
}

/// Rank quantized colors in `pixels` by frequency and keep the top `count`.
///
/// Ties keep the order in which buckets were first seen, scanning row by row.
pub fn rank_colors(pixels: &RgbaImage, config: &ColorAnalyzerConfig, count: usize) -> Vec<ColorSample> {
    let mut slots: HashMap<[u8; 3], usize> = HashMap::new();
    let mut buckets: Vec<([u8; 3], u32)> = Vec::new();

    for px in pixels.pixels() {
        let [r, g, b, a] = px.0;
        if a < config.alpha_threshold {
            continue;
        }
        let key = [
            quantize_channel(r, config.bucket_size),
            quantize_channel(g, config.bucket_size),
            quantize_channel(b, config.bucket_size),
        ];
        match slots.get(&key) {
            Some(&slot) => buckets[slot].1 += 1,
            None => {
                slots.insert(key, buckets.len());
                buckets.push((key, 1));
            }
        }
    }

    // sort_by is stable: equal counts stay in first-seen order.
    buckets.sort_by(|a, b| b.1.cmp(&a.1));
    buckets
        .into_iter()
        .take(count)
        .map(|(rgb, _)| ColorSample::from_rgb(rgb))
        .collect()
}
