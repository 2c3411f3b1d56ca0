//! Ports between the grading core and the outside world.
//!
//! Sheet images come in through [`ImageSource`], reports leave through
//! [`ResultOutput`], and batch progress is announced to a [`ProgressSink`].

mod image_source;
mod progress;
mod result_output;

pub use image_source::ImageSource;
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
