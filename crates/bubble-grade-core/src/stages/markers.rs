//! Corner marker detection.
//!
//! Pixels are sampled on a lattice of `sample_stride` pixels, classified as
//! dark below `dark_threshold`, and grouped by a 4-neighbour flood fill over
//! the lattice. Regions with a roughly square footprint become marker
//! candidates; the extremes of the candidate set become the four corners.

use image::GrayImage;
use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::{Bounds, CornerSet, GradeError, Point, Region};

/// Number of markers a sheet carries.
pub const REQUIRED_MARKERS: usize = 4;

/// Configuration for marker detection.
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Luma level below which a pixel counts as dark (0-255).
    pub dark_threshold: u8,
    /// Sampling step in pixels, in both directions.
    pub sample_stride: u32,
    /// Regions with fewer samples are discarded as noise.
    pub min_region_samples: usize,
    /// Smallest accepted width / height ratio.
    pub min_aspect: f32,
    /// Largest accepted width / height ratio.
    pub max_aspect: f32,
    /// Smallest accepted bounding-box area in pixels.
    pub min_area: u64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 80,
            sample_stride: 3,
            min_region_samples: 10,
            min_aspect: 0.5,
            max_aspect: 2.0,
            min_area: 100,
        }
    }
}

/// Output of marker detection.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerDetection {
    /// Dark regions that survived the sample-count filter.
    pub regions_found: usize,
    /// Regions that passed the shape filter.
    pub candidates: Vec<Region>,
    /// Regions assigned to corner roles.
    pub corners: CornerSet,
}

/// Boolean dark/light classification on the sampling lattice.
struct DarkLattice {
    cols: usize,
    rows: usize,
    stride: u32,
    dark: Vec<bool>,
}

impl DarkLattice {
    fn sample(gray: &GrayImage, threshold: u8, stride: u32) -> Self {
        let stride = stride.max(1);
        let (width, height) = gray.dimensions();
        let cols = width.div_ceil(stride) as usize;
        let rows = height.div_ceil(stride) as usize;
        let mut dark = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = Self::to_pixel(stride, col, row);
                dark.push(gray.get_pixel(x, y).0[0] < threshold);
            }
        }
        Self {
            cols,
            rows,
            stride,
            dark,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn to_pixel(stride: u32, col: usize, row: usize) -> (u32, u32) {
        (col as u32 * stride, row as u32 * stride)
    }

    /// Collects every 4-connected dark component, consuming the lattice.
    fn components(mut self) -> Vec<Vec<(usize, usize)>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        for start in 0..self.dark.len() {
            if !self.dark[start] {
                continue;
            }
            self.dark[start] = false;
            stack.push(start);
            let mut cells = Vec::new();

            while let Some(idx) = stack.pop() {
                let (col, row) = (idx % self.cols, idx / self.cols);
                cells.push((col, row));

                let mut visit = |n: usize| {
                    if self.dark[n] {
                        self.dark[n] = false;
                        stack.push(n);
                    }
                };
                if col > 0 {
                    visit(idx - 1);
                }
                if col + 1 < self.cols {
                    visit(idx + 1);
                }
                if row > 0 {
                    visit(idx - self.cols);
                }
                if row + 1 < self.rows {
                    visit(idx + self.cols);
                }
            }
            out.push(cells);
        }
        out
    }
}

/// Builds a region from lattice cells.
#[allow(clippy::cast_precision_loss)]
fn build_region(cells: &[(usize, usize)], stride: u32, width: u32, height: u32) -> Region {
    let pixels: Vec<(u32, u32)> = cells
        .iter()
        .map(|&(col, row)| DarkLattice::to_pixel(stride, col, row))
        .collect();

    let mut bounds = Bounds {
        min_x: u32::MAX,
        min_y: u32::MAX,
        max_x: 0,
        max_y: 0,
    };
    for &(x, y) in &pixels {
        bounds.min_x = bounds.min_x.min(x);
        bounds.min_y = bounds.min_y.min(y);
        bounds.max_x = bounds.max_x.max(x);
        bounds.max_y = bounds.max_y.max(y);
    }

    // Each sample stands for a stride x stride cell of the image.
    let region_width = (bounds.max_x - bounds.min_x + stride).min(width - bounds.min_x);
    let region_height = (bounds.max_y - bounds.min_y + stride).min(height - bounds.min_y);

    Region {
        pixels,
        bounds,
        center: Point::new(
            bounds.min_x as f32 + region_width as f32 / 2.0,
            bounds.min_y as f32 + region_height as f32 / 2.0,
        ),
        width: region_width,
        height: region_height,
    }
}

/// Finds connected dark regions with at least `min_region_samples` samples.
#[must_use]
pub fn find_dark_regions(gray: &GrayImage, config: &MarkerConfig) -> Vec<Region> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let lattice = DarkLattice::sample(gray, config.dark_threshold, config.sample_stride);
    let stride = lattice.stride;

    lattice
        .components()
        .into_iter()
        .filter(|cells| cells.len() >= config.min_region_samples)
        .map(|cells| build_region(&cells, stride, width, height))
        .collect()
}

/// Keeps regions whose shape could be a marker.
#[must_use]
pub fn marker_candidates(regions: Vec<Region>, config: &MarkerConfig) -> Vec<Region> {
    regions
        .into_iter()
        .filter(|r| {
            let ratio = r.aspect_ratio();
            let keep = (config.min_aspect..=config.max_aspect).contains(&ratio)
                && r.area() > config.min_area;
            if !keep {
                trace!(
                    "Rejected region at ({:.0}, {:.0}): ratio={ratio:.2} area={}",
                    r.center.x,
                    r.center.y,
                    r.area()
                );
            }
            keep
        })
        .collect()
}

/// Assigns candidates to corner roles.
///
/// Candidates are ordered by center y, then x. The two topmost form the top
/// pair and the two bottommost the bottom pair; within a pair the smaller x
/// is the left corner.
///
/// # Errors
///
/// Returns [`GradeError::InsufficientMarkers`] with fewer than four candidates.
pub fn assign_corners(candidates: &[Region]) -> Result<CornerSet, GradeError> {
    if candidates.len() < REQUIRED_MARKERS {
        return Err(GradeError::InsufficientMarkers {
            found: candidates.len(),
            required: REQUIRED_MARKERS,
        });
    }

    let mut sorted: Vec<&Region> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        a.center
            .y
            .total_cmp(&b.center.y)
            .then(a.center.x.total_cmp(&b.center.x))
    });

    let n = sorted.len();
    let (top_left, top_right) = ordered_pair(sorted[0], sorted[1]);
    let (bottom_left, bottom_right) = ordered_pair(sorted[n - 2], sorted[n - 1]);

    Ok(CornerSet {
        top_left: top_left.clone(),
        top_right: top_right.clone(),
        bottom_left: bottom_left.clone(),
        bottom_right: bottom_right.clone(),
    })
}

fn ordered_pair<'a>(a: &'a Region, b: &'a Region) -> (&'a Region, &'a Region) {
    if a.center.x <= b.center.x {
        (a, b)
    } else {
        (b, a)
    }
}

/// Runs region search, shape filtering, and corner assignment.
///
/// # Errors
///
/// Returns [`GradeError::InsufficientMarkers`] when fewer than four
/// candidates are found.
pub fn detect_markers(gray: &GrayImage, config: &MarkerConfig) -> Result<MarkerDetection, GradeError> {
    let regions = find_dark_regions(gray, config);
    let regions_found = regions.len();
    let candidates = marker_candidates(regions, config);
    debug!(
        "Marker detection: {regions_found} dark regions, {} candidates",
        candidates.len()
    );

    let corners = assign_corners(&candidates)?;
    Ok(MarkerDetection {
        regions_found,
        candidates,
        corners,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::CornerRole;
    use image::Luma;

    /// White canvas with solid black squares at the given (x, y, size).
    fn canvas(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = squares
                .iter()
                .any(|&(sx, sy, s)| x >= sx && x < sx + s && y >= sy && y < sy + s);
            if inside {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    fn four_corners() -> GrayImage {
        canvas(
            400,
            300,
            &[(20, 20, 40), (340, 20, 40), (20, 240, 40), (340, 240, 40)],
        )
    }

    #[test]
    fn test_default_config() {
        let config = MarkerConfig::default();
        assert_eq!(config.dark_threshold, 80);
        assert_eq!(config.sample_stride, 3);
        assert!((config.min_aspect - 0.5).abs() < f32::EPSILON);
        assert!((config.max_aspect - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_finds_each_square_once() {
        let regions = find_dark_regions(&four_corners(), &MarkerConfig::default());
        assert_eq!(regions.len(), 4);
        for r in &regions {
            // 40px square sampled every 3px: 13 or 14 samples per side
            assert!((169..=196).contains(&r.sample_count()));
            assert!((39..=42).contains(&r.width), "width {}", r.width);
            assert!((39..=42).contains(&r.height), "height {}", r.height);
        }
    }

    #[test]
    fn test_one_region_per_corner_role() {
        let detection =
            detect_markers(&four_corners(), &MarkerConfig::default()).expect("four markers");
        assert_eq!(detection.candidates.len(), 4);

        let c = &detection.corners;
        assert!(c.top_left.center.x < 100.0 && c.top_left.center.y < 100.0);
        assert!(c.top_right.center.x > 300.0 && c.top_right.center.y < 100.0);
        assert!(c.bottom_left.center.x < 100.0 && c.bottom_left.center.y > 200.0);
        assert!(c.bottom_right.center.x > 300.0 && c.bottom_right.center.y > 200.0);

        let roles: Vec<_> = c.iter().map(|(role, _)| role).collect();
        assert_eq!(roles, CornerRole::ALL);
    }

    #[test]
    fn test_three_markers_is_insufficient() {
        let img = canvas(400, 300, &[(20, 20, 40), (340, 20, 40), (20, 240, 40)]);
        let err = detect_markers(&img, &MarkerConfig::default()).expect_err("three markers");
        assert_eq!(
            err,
            GradeError::InsufficientMarkers {
                found: 3,
                required: 4
            }
        );
    }

    #[test]
    fn test_noise_below_min_samples_discarded() {
        // 6px specks cover at most 2 x 2 samples
        let img = canvas(100, 100, &[(10, 10, 6), (50, 50, 6)]);
        assert!(find_dark_regions(&img, &MarkerConfig::default()).is_empty());
    }

    #[test]
    fn test_elongated_regions_are_not_candidates() {
        let img = GrayImage::from_fn(300, 100, |x, y| {
            if (10..250).contains(&x) && (10..40).contains(&y) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let config = MarkerConfig::default();
        let regions = find_dark_regions(&img, &config);
        assert_eq!(regions.len(), 1);
        assert!(marker_candidates(regions, &config).is_empty());
    }

    #[test]
    fn test_small_area_is_not_candidate() {
        let config = MarkerConfig {
            min_region_samples: 1,
            ..Default::default()
        };
        // 9px square: 3 x 3 samples, 9 x 9 footprint = 81 px area
        let img = canvas(60, 60, &[(9, 9, 9)]);
        let regions = find_dark_regions(&img, &config);
        assert_eq!(regions.len(), 1);
        assert!(marker_candidates(regions, &config).is_empty());
    }

    #[test]
    fn test_gray_above_threshold_is_light() {
        let img = GrayImage::from_fn(100, 100, |_, _| Luma([80u8]));
        assert!(find_dark_regions(&img, &MarkerConfig::default()).is_empty());
    }

    #[test]
    fn test_extra_interior_candidates_do_not_steal_corners() {
        let img = canvas(
            400,
            300,
            &[
                (20, 20, 40),
                (340, 20, 40),
                (20, 240, 40),
                (340, 240, 40),
                (180, 130, 40),
            ],
        );
        let detection = detect_markers(&img, &MarkerConfig::default()).expect("markers");
        assert_eq!(detection.candidates.len(), 5);
        assert!(detection.corners.bottom_right.center.x > 300.0);
        assert!(detection.corners.top_right.center.y < 100.0);
    }

    #[test]
    fn test_empty_image() {
        let err = detect_markers(&GrayImage::new(0, 0), &MarkerConfig::default())
            .expect_err("nothing to find");
        assert!(matches!(err, GradeError::InsufficientMarkers { found: 0, .. }));
    }
}
