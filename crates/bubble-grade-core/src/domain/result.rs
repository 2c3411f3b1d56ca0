//! Per-image report types.

use std::ops::Deref;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ErrorKind, GradeResult};

/// Report for a single processed sheet image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetReport {
    /// Path to the sheet image.
    pub path: String,
    /// Timestamp of processing (ISO 8601).
    pub timestamp: String,
    /// Image dimensions.
    pub dimensions: ImageDimensions,
    /// Grading outcome.
    #[serde(flatten)]
    pub outcome: SheetOutcome,
}

impl SheetReport {
    /// Returns true when the sheet was graded.
    #[must_use]
    pub const fn is_graded(&self) -> bool {
        matches!(self.outcome, SheetOutcome::Graded { .. })
    }
}

/// Outcome of grading one sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    /// The sheet was scored against the answer key.
    Graded {
        /// Scoring result.
        result: GradeResult,
    },
    /// The pass aborted before a score could be produced.
    Rejected {
        /// Coarse error category.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded sheet image together with where it came from.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Path to the image file.
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded image data.
    pub image: image::DynamicImage,
}

impl ImageInfo {
    /// Wraps a decoded image, taking dimensions from the buffer.
    #[must_use]
    pub fn new(path: impl Into<String>, image: image::DynamicImage) -> Self {
        Self {
            path: path.into(),
            width: image.width(),
            height: image.height(),
            image,
        }
    }

    /// Returns the image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }

    /// File stem of the source path, used as the student identifier.
    #[must_use]
    pub fn stem(&self) -> Option<String> {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }
}

impl Deref for ImageInfo {
    type Target = image::DynamicImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_info_dimensions() {
        let info = ImageInfo::new("sheets/alice.png", image::DynamicImage::new_rgb8(30, 20));
        assert_eq!(info.dimensions(), ImageDimensions::new(30, 20));
        assert_eq!(info.stem().as_deref(), Some("alice"));
    }

    #[test]
    fn test_stem_missing_for_synthetic_path() {
        let info = ImageInfo::new("", image::DynamicImage::new_rgb8(1, 1));
        assert!(info.stem().is_none());
    }
}
