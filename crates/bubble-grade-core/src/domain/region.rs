//! Geometry of detected marker regions and the grid they frame.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Inclusive pixel bounds of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column.
    pub max_x: u32,
    /// Bottom row.
    pub max_y: u32,
}

/// A connected set of dark pixels found by flood fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Sampled pixel coordinates belonging to the region.
    #[serde(skip)]
    pub pixels: Vec<(u32, u32)>,
    /// Bounds of the sampled pixels.
    pub bounds: Bounds,
    /// Midpoint of the bounds.
    pub center: Point,
    /// Horizontal extent in pixels.
    pub width: u32,
    /// Vertical extent in pixels.
    pub height: u32,
}

impl Region {
    /// Number of sampled pixels in the region.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.pixels.len()
    }

    /// Bounding-box area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width over height.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    /// Mean of width and height, used as the marker size.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn size(&self) -> f32 {
        (self.width + self.height) as f32 / 2.0
    }

    /// Half of the width.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.width as f32 / 2.0
    }

    /// Half of the height.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn half_height(&self) -> f32 {
        self.height as f32 / 2.0
    }
}

/// Role of a marker on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRole {
    /// Top-left marker.
    TopLeft,
    /// Top-right marker.
    TopRight,
    /// Bottom-left marker.
    BottomLeft,
    /// Bottom-right marker.
    BottomRight,
}

impl CornerRole {
    /// All roles in reading order.
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];
}

/// The four markers, one per corner role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CornerSet {
    /// Top-left marker.
    pub top_left: Region,
    /// Top-right marker.
    pub top_right: Region,
    /// Bottom-left marker.
    pub bottom_left: Region,
    /// Bottom-right marker.
    pub bottom_right: Region,
}

impl CornerSet {
    /// Returns the marker for a role.
    #[must_use]
    pub const fn get(&self, role: CornerRole) -> &Region {
        match role {
            CornerRole::TopLeft => &self.top_left,
            CornerRole::TopRight => &self.top_right,
            CornerRole::BottomLeft => &self.bottom_left,
            CornerRole::BottomRight => &self.bottom_right,
        }
    }

    /// Iterates markers in reading order.
    pub fn iter(&self) -> impl Iterator<Item = (CornerRole, &Region)> {
        CornerRole::ALL.into_iter().map(|role| (role, self.get(role)))
    }
}

/// Axis-aligned grid rectangle inside the markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Center of the rectangle.
    pub center: Point,
}

impl GridBounds {
    /// Builds bounds from edges, clamping inverted edges to zero size.
    #[must_use]
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        let width = (right - left).max(0.0);
        let height = (bottom - top).max(0.0);
        Self {
            x: left,
            y: top,
            width,
            height,
            center: Point::new(left + width / 2.0, top + height / 2.0),
        }
    }

    /// Width over height; zero when the height is zero.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height <= 0.0 {
            return 0.0;
        }
        self.width / self.height
    }

    /// Integer pixel window `(x, y, width, height)` clipped to an image.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn pixel_window(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let x = (self.x.round().max(0.0) as u32).min(image_width);
        let y = (self.y.round().max(0.0) as u32).min(image_height);
        let right = ((self.x + self.width).round().max(0.0) as u32).min(image_width);
        let bottom = ((self.y + self.height).round().max(0.0) as u32).min(image_height);
        (x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(width: u32, height: u32) -> Region {
        Region {
            pixels: vec![(0, 0)],
            bounds: Bounds {
                min_x: 0,
                min_y: 0,
                max_x: width,
                max_y: height,
            },
            center: Point::new(0.0, 0.0),
            width,
            height,
        }
    }

    #[test]
    fn test_region_metrics() {
        let r = region(40, 20);
        assert_eq!(r.area(), 800);
        assert!((r.aspect_ratio() - 2.0).abs() < f32::EPSILON);
        assert!((r.size() - 30.0).abs() < f32::EPSILON);
        assert!((r.half_height() - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_height_aspect() {
        assert!(region(10, 0).aspect_ratio().abs() < f32::EPSILON);
    }

    #[test]
    fn test_grid_bounds_from_edges() {
        let g = GridBounds::from_edges(10.0, 20.0, 110.0, 70.0);
        assert!((g.width - 100.0).abs() < f32::EPSILON);
        assert!((g.height - 50.0).abs() < f32::EPSILON);
        assert_eq!(g.center, Point::new(60.0, 45.0));
        assert!((g.aspect_ratio() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_inverted_edges_clamp() {
        let g = GridBounds::from_edges(50.0, 50.0, 10.0, 10.0);
        assert!(g.width.abs() < f32::EPSILON);
        assert!(g.aspect_ratio().abs() < f32::EPSILON);
    }

    #[test]
    fn test_pixel_window_clips_to_image() {
        let g = GridBounds::from_edges(-5.0, 10.0, 120.0, 40.0);
        assert_eq!(g.pixel_window(100, 100), (0, 10, 100, 30));
    }
}
