//! Test support utilities for bubble-grade.
//!
//! Provides synthetic answer sheets and mock port implementations for
//! testing the grading pipeline without files on disk.
//!
//! # Example
//!
//! ```
//! use bubble_grade_core::AnswerKey;
//! use bubble_grade_test_support::{MockImageSource, SyntheticSheetBuilder};
//!
//! let key: AnswerKey = "ABCD".parse().unwrap();
//! let sheet = SyntheticSheetBuilder::answered(&key).path("alice.png").build();
//! let source = MockImageSource::new(vec![sheet]);
//! ```

mod builders;
mod mocks;

pub use builders::{
    SyntheticImageBuilder, SyntheticSheetBuilder, MARKER_SIZE, MIN_GRID_HEIGHT, ROW_HEIGHT,
    SHEET_MARGIN, SHEET_WIDTH,
};
pub use mocks::{MockImageSource, MockProgressSink, MockResultOutput};
