//! One grading pass over a single sheet image.

use image::{imageops, GrayImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{AnswerKey, GradeError, GradeResult, GridBounds, ImageInfo};
use crate::stages::{
    detect_markers, extract_answers, grid_bounds, preflight, score_answers, to_gray,
    validate_grid, AnswerConfig, GridConfig, GridValidation, MarkerConfig, MarkerDetection,
    PreflightConfig,
};

/// Settings for every stage of a pass.
#[derive(Debug, Clone, Default)]
pub struct GraderConfig {
    /// Size and brightness limits.
    pub preflight: PreflightConfig,
    /// Marker detection.
    pub markers: MarkerConfig,
    /// Grid geometry tolerances.
    pub grid: GridConfig,
    /// Bubble layout and fill threshold.
    pub answers: AnswerConfig,
}

/// Markers and grid found on a sheet, before any bubble is read.
#[derive(Debug, Clone, Serialize)]
pub struct SheetDetection {
    /// Marker detection output.
    pub markers: MarkerDetection,
    /// Grid rectangle inside the markers.
    pub grid: GridBounds,
    /// Geometry checks.
    pub validation: GridValidation,
}

/// Runs marker detection, grid validation, bubble reading, and scoring.
#[derive(Debug, Clone, Default)]
pub struct SheetGrader {
    config: GraderConfig,
}

impl SheetGrader {
    /// Creates a grader with the given configuration.
    #[must_use]
    pub const fn new(config: GraderConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Finds markers and the grid without scoring.
    ///
    /// The returned detection may carry a failed validation; callers decide
    /// whether to continue.
    ///
    /// # Errors
    ///
    /// Returns preflight errors or [`GradeError::InsufficientMarkers`].
    pub fn detect(&self, image: &ImageInfo) -> Result<SheetDetection, GradeError> {
        let gray = to_gray(image);
        self.detect_gray(&gray)
    }

    fn detect_gray(&self, gray: &GrayImage) -> Result<SheetDetection, GradeError> {
        if self.config.preflight.enabled {
            preflight(gray, self.config.markers.dark_threshold, &self.config.preflight)?;
        }

        let markers = detect_markers(gray, &self.config.markers)?;
        let grid = grid_bounds(&markers.corners);
        let validation = validate_grid(&markers.corners, &grid, &self.config.grid);

        Ok(SheetDetection {
            markers,
            grid,
            validation,
        })
    }

    /// Grades one sheet against `key`.
    ///
    /// The key length sets how many question rows are read. The student id
    /// is the file stem of the image path.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the pass: preflight, missing markers,
    /// invalid geometry, a key using more options than the layout, or a
    /// grid too small for the layout.
    pub fn grade(&self, image: &ImageInfo, key: &AnswerKey) -> Result<GradeResult, GradeError> {
        let answers = &self.config.answers;
        answers.validate()?;
        if key.options_used() > answers.options {
            return Err(GradeError::KeyOutOfRange {
                used: key.options_used(),
                options: answers.options,
            });
        }

        let gray = to_gray(image);
        let detection = self.detect_gray(&gray)?;
        if let Some(failure) = detection.validation.failure {
            return Err(GradeError::InvalidGeometry(failure));
        }

        let grid = crop_grid(&gray, &detection.grid);
        debug!(
            "Cropped grid {}x{} from {}x{}",
            grid.width(),
            grid.height(),
            gray.width(),
            gray.height()
        );

        let read = extract_answers(
            &grid,
            key.len(),
            self.config.markers.dark_threshold,
            answers,
        )?;
        let result = score_answers(key, &read, image.stem())?;
        info!(
            "Graded {}: {}/{} correct ({}%)",
            image.path, result.correct, result.total, result.score
        );
        Ok(result)
    }
}

/// Copies the grid rectangle out of the full gray image.
fn crop_grid(gray: &GrayImage, bounds: &GridBounds) -> GrayImage {
    let (x, y, width, height) = bounds.pixel_window(gray.width(), gray.height());
    imageops::crop_imm(gray, x, y, width, height).to_image()
}
