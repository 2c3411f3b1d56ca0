//! Rejects images that cannot hold a readable sheet before any detection runs.

use image::GrayImage;
use tracing::debug;

use super::imaging::Histogram;
use crate::domain::GradeError;

/// Limits for the preflight check.
#[derive(Debug, Clone)]
pub struct PreflightConfig {
    /// Skip the check entirely.
    pub enabled: bool,
    /// Minimum image width in pixels.
    pub min_width: u32,
    /// Minimum image height in pixels.
    pub min_height: u32,
    /// Minimum mean luma (0-255).
    pub min_mean: f64,
    /// Minimum fraction of pixels darker than the dark threshold.
    pub min_dark_fraction: f64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_width: 200,
            min_height: 200,
            min_mean: 60.0,
            min_dark_fraction: 0.002,
        }
    }
}

/// Brightness statistics gathered by the preflight check.
#[derive(Debug, Clone, Copy)]
pub struct PreflightStats {
    /// Mean luma.
    pub mean: f64,
    /// Fraction of pixels below the dark threshold.
    pub dark_fraction: f64,
}

/// Checks size and brightness of a gray image.
///
/// `dark_threshold` is the same level marker detection uses, so "too bright"
/// means there is not enough ink for markers to exist.
///
/// # Errors
///
/// Returns the first of [`GradeError::ImageTooSmall`],
/// [`GradeError::ImageTooDark`], or [`GradeError::ImageTooBright`] that applies.
pub fn preflight(
    gray: &GrayImage,
    dark_threshold: u8,
    config: &PreflightConfig,
) -> Result<PreflightStats, GradeError> {
    let (width, height) = gray.dimensions();
    if width < config.min_width || height < config.min_height {
        return Err(GradeError::ImageTooSmall {
            width,
            height,
            min_width: config.min_width,
            min_height: config.min_height,
        });
    }

    let histogram = Histogram::from_luma(gray);
    let stats = PreflightStats {
        mean: histogram.mean(),
        dark_fraction: histogram.fraction_below(dark_threshold),
    };
    debug!(
        "Preflight: mean={:.1} dark_fraction={:.4}",
        stats.mean, stats.dark_fraction
    );

    if stats.mean < config.min_mean {
        return Err(GradeError::ImageTooDark {
            mean: stats.mean,
            min_mean: config.min_mean,
        });
    }
    if stats.dark_fraction < config.min_dark_fraction {
        return Err(GradeError::ImageTooBright {
            dark_fraction: stats.dark_fraction,
            min_dark_fraction: config.min_dark_fraction,
        });
    }

    Ok(stats)
}
