//! Core domain types for answer-sheet grading.

mod answer;
mod error;
mod region;
mod result;

pub use answer::{
    AnswerKey, Choice, GradeResult, KeyParseError, MarkStatus, QuestionAnswer, QuestionOutcome,
    MAX_OPTIONS,
};
pub use error::{ErrorKind, GradeError, GridFailure};
pub use region::{Bounds, CornerRole, CornerSet, GridBounds, Point, Region};
pub use result::{ImageDimensions, ImageInfo, SheetOutcome, SheetReport};
