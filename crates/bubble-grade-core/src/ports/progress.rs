//! Progress reporting port for UI integration.

use crate::domain::SheetReport;

/// Events emitted while a batch of sheets is processed.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Processing started for a sheet.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// A sheet was graded or rejected.
    Completed {
        /// The sheet report.
        report: SheetReport,
    },
    /// An image could not be loaded.
    Skipped {
        /// Path or position of the image.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// All images have been processed.
    Finished {
        /// Sheets that produced a score.
        graded: usize,
        /// Sheets rejected by the pipeline.
        rejected: usize,
        /// Images that failed to load.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
