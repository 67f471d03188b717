// src/engine/metadata.rs
//
// Read-only descriptor combining file facts, dimensions and dominant colors.

use crate::engine::color::ColorSample;
use crate::engine::geometry::Size;
use crate::engine::resource::ImageResource;
use std::time::SystemTime;

/// Width and height within this many pixels count as square.
pub const SQUARE_TOLERANCE_PX: u32 = 50;

/// Colors included in a metadata snapshot.
pub const METADATA_COLOR_COUNT: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageMetadata {
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub last_modified: SystemTime,
    pub dimensions: Size,
    pub dominant_colors: Vec<ColorSample>,
    pub aspect_ratio: f64,
    pub is_landscape: bool,
    pub is_portrait: bool,
    pub is_square: bool,
}

impl ImageMetadata {
    pub fn assemble(resource: &ImageResource, dimensions: Size, dominant_colors: Vec<ColorSample>) -> Self {
        let Size { width, height } = dimensions;
        Self {
            name: resource.name().to_string(),
            size: resource.size(),
            mime: resource.mime().to_string(),
            last_modified: resource.last_modified(),
            dimensions,
            dominant_colors,
            aspect_ratio: dimensions.aspect_ratio(),
            is_landscape: width > height,
            is_portrait: height > width,
            is_square: width.abs_diff(height) < SQUARE_TOLERANCE_PX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(width: u32, height: u32) -> ImageMetadata {
        let r = ImageResource::new(vec![1, 2, 3], "image/png", "p.png");
        ImageMetadata::assemble(&r, Size::new(width, height), vec![])
    }

    #[test]
    fn test_orientation_flags() {
        let m = meta(400, 300);
        assert!(m.is_landscape && !m.is_portrait && !m.is_square);
        assert!((m.aspect_ratio - 4.0 / 3.0).abs() < 1e-12);

        let m = meta(300, 400);
        assert!(m.is_portrait && !m.is_landscape);
    }

    #[test]
    fn test_square_is_absolute_tolerance() {
        let m = meta(1049, 1000);
        assert!(m.is_square && m.is_landscape);
        assert!(!meta(1050, 1000).is_square);
        assert!(meta(10, 59).is_square);
        let m = meta(500, 500);
        assert!(m.is_square && !m.is_landscape && !m.is_portrait);
    }

    #[test]
    fn test_copies_file_facts() {
        let m = meta(1, 1);
        assert_eq!((m.name.as_str(), m.size, m.mime.as_str()), ("p.png", 3, "image/png"));
    }
}
