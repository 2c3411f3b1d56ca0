//! Error types for a grading pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CornerRole;

/// Reasons a single grading pass aborts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeError {
    /// The image is smaller than the configured minimum.
    #[error("image too small: {width}x{height} (minimum {min_width}x{min_height})")]
    ImageTooSmall {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Minimum width.
        min_width: u32,
        /// Minimum height.
        min_height: u32,
    },

    /// Mean brightness is below the configured minimum.
    #[error("image too dark: mean brightness {mean:.1} below {min_mean:.1}")]
    ImageTooDark {
        /// Mean luma.
        mean: f64,
        /// Configured minimum.
        min_mean: f64,
    },

    /// Almost no dark ink is visible.
    #[error("image too bright: {dark_fraction:.4} of pixels are dark (need {min_dark_fraction:.4})")]
    ImageTooBright {
        /// Fraction of dark pixels.
        dark_fraction: f64,
        /// Configured minimum fraction.
        min_dark_fraction: f64,
    },

    /// Fewer than four marker candidates survived filtering.
    #[error("insufficient markers found: {found} of {required}")]
    InsufficientMarkers {
        /// Candidates found.
        found: usize,
        /// Candidates required.
        required: usize,
    },

    /// The markers were found but their geometry is unusable.
    #[error("invalid marker geometry: {0}")]
    InvalidGeometry(GridFailure),

    /// Answer key length does not match the detected question count.
    #[error("answer key has {key} questions but {detected} were read")]
    KeyMismatch {
        /// Key length.
        key: usize,
        /// Detected question count.
        detected: usize,
    },

    /// The key uses more options than the sheet layout has.
    #[error("answer key uses {used} options but the sheet has {options}")]
    KeyOutOfRange {
        /// Options referenced by the key.
        used: usize,
        /// Options per question on the sheet.
        options: usize,
    },

    /// Any other failure inside the pass.
    #[error("processing failed: {0}")]
    Processing(String),
}

impl GradeError {
    /// Coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageTooSmall { .. } => ErrorKind::ImageTooSmall,
            Self::ImageTooDark { .. } => ErrorKind::ImageTooDark,
            Self::ImageTooBright { .. } => ErrorKind::ImageTooBright,
            Self::InsufficientMarkers { .. } => ErrorKind::InsufficientMarkers,
            Self::InvalidGeometry(_) => ErrorKind::InvalidGeometry,
            Self::KeyMismatch { .. } | Self::KeyOutOfRange { .. } | Self::Processing(_) => {
                ErrorKind::Processing
            }
        }
    }
}

/// Coarse error category reported alongside rejected sheets.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Image below minimum dimensions.
    ImageTooSmall,
    /// Image too dark.
    ImageTooDark,
    /// Image too bright.
    ImageTooBright,
    /// Fewer than four markers.
    InsufficientMarkers,
    /// Marker geometry failed validation.
    InvalidGeometry,
    /// Anything else.
    Processing,
}

/// The first grid validation check that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridFailure {
    /// A marker is smaller or larger than allowed.
    #[error("{role:?} marker size {size:.1}px outside {min}..={max}px")]
    MarkerSize {
        /// Offending marker.
        role: CornerRole,
        /// Its size.
        size: f32,
        /// Minimum size.
        min: u32,
        /// Maximum size.
        max: u32,
    },

    /// The grid rectangle is too small.
    #[error("grid {width:.1}x{height:.1}px smaller than {min}px")]
    GridTooSmall {
        /// Grid width.
        width: f32,
        /// Grid height.
        height: f32,
        /// Minimum side length.
        min: u32,
    },

    /// The grid rectangle is too elongated.
    #[error("grid aspect ratio {ratio:.2} outside {min:.2}..={max:.2}")]
    AspectRatio {
        /// Measured ratio.
        ratio: f32,
        /// Minimum ratio.
        min: f32,
        /// Maximum ratio.
        max: f32,
    },

    /// Marker sizes vary too much.
    #[error("marker quality {quality:.1} not above {min:.1}")]
    LowQuality {
        /// Measured quality.
        quality: f32,
        /// Required minimum.
        min: f32,
    },
}
