//! Grading stages, each a pure function over image buffers or domain values.
//!
//! Order of a pass: [`preflight`] → [`markers`] → [`grid`] → crop →
//! [`answers`] → [`scoring`].

pub mod answers;
pub mod grid;
pub mod imaging;
pub mod markers;
pub mod preflight;
pub mod scoring;

pub use answers::{classify_marks, extract_answers, AnswerConfig};
pub use grid::{grid_bounds, marker_quality, validate_grid, GridConfig, GridValidation};
pub use imaging::{luma, to_gray, Histogram};
pub use markers::{
    assign_corners, detect_markers, find_dark_regions, marker_candidates, MarkerConfig,
    MarkerDetection, REQUIRED_MARKERS,
};
pub use preflight::{preflight, PreflightConfig, PreflightStats};
pub use scoring::{score_answers, score_percent};
