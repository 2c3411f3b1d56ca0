//! Grid rectangle inference and geometry validation.

use serde::Serialize;
use tracing::debug;

use crate::domain::{CornerSet, GridBounds, GridFailure};

/// Geometry tolerances for a detected grid.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Smallest accepted marker size in pixels.
    pub min_marker_size: u32,
    /// Largest accepted marker size in pixels.
    pub max_marker_size: u32,
    /// Smallest accepted grid width and height in pixels.
    pub min_grid_size: u32,
    /// Smallest accepted grid width / height ratio.
    pub min_aspect: f32,
    /// Largest accepted grid width / height ratio.
    pub max_aspect: f32,
    /// Quality must be strictly above this value (0-100).
    pub min_quality: f32,
    /// Quality points lost per square pixel of marker size variance.
    pub quality_penalty: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_marker_size: 20,
            max_marker_size: 200,
            min_grid_size: 100,
            min_aspect: 0.3,
            max_aspect: 3.0,
            min_quality: 50.0,
            quality_penalty: 10.0,
        }
    }
}

/// Result of validating the grid geometry.
#[derive(Debug, Clone, Serialize)]
pub struct GridValidation {
    /// Marker consistency score (100 for identical markers, may go negative).
    pub quality: f32,
    /// Marker sizes in reading order.
    pub marker_sizes: [f32; 4],
    /// First failed check, if any.
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<GridFailure>,
}

impl GridValidation {
    /// True when every check passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// Rejection reason for display.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

#[allow(clippy::ref_option)]
fn serialize_failure<S: serde::Serializer>(
    failure: &Option<GridFailure>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(f) => serializer.serialize_some(&f.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Rectangle enclosed by the inner edges of the four markers.
///
/// Each marker contributes the corner of its own box that faces the sheet
/// center: its center moved inwards by half its width and half its height.
#[must_use]
pub fn grid_bounds(corners: &CornerSet) -> GridBounds {
    let tl = &corners.top_left;
    let tr = &corners.top_right;
    let bl = &corners.bottom_left;
    let br = &corners.bottom_right;

    let left = (tl.center.x + tl.half_width()).min(bl.center.x + bl.half_width());
    let right = (tr.center.x - tr.half_width()).max(br.center.x - br.half_width());
    let top = (tl.center.y + tl.half_height()).min(tr.center.y + tr.half_height());
    let bottom = (bl.center.y - bl.half_height()).max(br.center.y - br.half_height());

    GridBounds::from_edges(left, top, right, bottom)
}

/// Marker consistency score.
///
/// `100 - penalty * v`, where `v` is the variance of the sizes around their
/// mean in square pixels. Four equal sizes score 100.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn marker_quality(sizes: &[f32], penalty: f32) -> f32 {
    if sizes.is_empty() {
        return 0.0;
    }
    let n = sizes.len() as f32;
    let mean = sizes.iter().sum::<f32>() / n;
    let variance = sizes.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n;
    penalty.mul_add(-variance, 100.0)
}

/// Runs the geometry checks in order and records the first failure.
#[must_use]
pub fn validate_grid(corners: &CornerSet, bounds: &GridBounds, config: &GridConfig) -> GridValidation {
    let marker_sizes = [
        corners.top_left.size(),
        corners.top_right.size(),
        corners.bottom_left.size(),
        corners.bottom_right.size(),
    ];
    let quality = marker_quality(&marker_sizes, config.quality_penalty);
    let failure = first_failure(corners, bounds, quality, config);

    match &failure {
        Some(f) => debug!("Grid rejected: {f}"),
        None => debug!(
            "Grid accepted: {:.0}x{:.0} at ({:.0}, {:.0}), quality {quality:.1}",
            bounds.width, bounds.height, bounds.x, bounds.y
        ),
    }

    GridValidation {
        quality,
        marker_sizes,
        failure,
    }
}

#[allow(clippy::cast_precision_loss)]
fn first_failure(
    corners: &CornerSet,
    bounds: &GridBounds,
    quality: f32,
    config: &GridConfig,
) -> Option<GridFailure> {
    let size_range = config.min_marker_size as f32..=config.max_marker_size as f32;
    for (role, marker) in corners.iter() {
        let out_of_range = !size_range.contains(&(marker.width as f32))
            || !size_range.contains(&(marker.height as f32));
        if out_of_range {
            return Some(GridFailure::MarkerSize {
                role,
                size: marker.size(),
                min: config.min_marker_size,
                max: config.max_marker_size,
            });
        }
    }

    let min_grid = config.min_grid_size as f32;
    if bounds.width < min_grid || bounds.height < min_grid {
        return Some(GridFailure::GridTooSmall {
            width: bounds.width,
            height: bounds.height,
            min: config.min_grid_size,
        });
    }

    let ratio = bounds.aspect_ratio();
    if !(config.min_aspect..=config.max_aspect).contains(&ratio) {
        return Some(GridFailure::AspectRatio {
            ratio,
            min: config.min_aspect,
            max: config.max_aspect,
        });
    }

    if quality <= config.min_quality {
        return Some(GridFailure::LowQuality {
            quality,
            min: config.min_quality,
        });
    }

    None
}
