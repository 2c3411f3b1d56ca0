//! Bubble Grade Core - Domain logic and grading stages
//!
//! This crate contains the domain types, the port traits, and the stages that
//! take a photographed answer sheet from raw pixels to a score: corner marker
//! detection, grid validation, bubble reading, and comparison with a key.

pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod stages;

pub use domain::{
    AnswerKey, Choice, ErrorKind, GradeError, GradeResult, GridFailure, ImageDimensions,
    ImageInfo, MarkStatus, QuestionAnswer, SheetOutcome, SheetReport,
};
pub use pipeline::{GraderConfig, SheetDetection, SheetGrader};
pub use ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput};
