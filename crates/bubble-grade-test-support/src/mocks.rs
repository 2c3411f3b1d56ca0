//! In-memory stand-ins for the core ports.

use std::sync::{Mutex, PoisonError};

use bubble_grade_core::domain::{ImageInfo, SheetReport};
use bubble_grade_core::ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput};

/// Append-only list shared behind `&self`.
#[derive(Debug)]
struct Log<T>(Mutex<Vec<T>>);

impl<T: Clone> Log<T> {
    const fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn push(&self, item: T) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(item);
    }

    fn snapshot(&self) -> Vec<T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// One entry yielded by [`MockImageSource`].
#[derive(Debug, Clone)]
enum Entry {
    Image(ImageInfo),
    Broken(String),
}

/// Image source yielding pre-built sheets, optionally interleaved with
/// load failures.
#[derive(Debug)]
pub struct MockImageSource {
    entries: Vec<Entry>,
    passes: Log<()>,
}

impl MockImageSource {
    /// Creates a source over the given images.
    #[must_use]
    pub fn new(images: Vec<ImageInfo>) -> Self {
        Self {
            entries: images.into_iter().map(Entry::Image).collect(),
            passes: Log::new(),
        }
    }

    /// Creates a source with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Appends an entry that fails to load with `message`.
    #[must_use]
    pub fn with_broken(mut self, message: impl Into<String>) -> Self {
        self.entries.push(Entry::Broken(message.into()));
        self
    }

    /// Number of times `images()` was called.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        self.passes.len()
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_> {
        self.passes.push(());
        Box::new(self.entries.iter().map(|entry| match entry {
            Entry::Image(info) => Ok(info.clone()),
            Entry::Broken(message) => Err(anyhow::anyhow!("{message}")),
        }))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Output that keeps every report in memory.
#[derive(Debug)]
pub struct MockResultOutput {
    reports: Log<SheetReport>,
    flushes: Log<()>,
}

impl MockResultOutput {
    /// Creates an empty output.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reports: Log::new(),
            flushes: Log::new(),
        }
    }

    /// Reports written so far, in order.
    #[must_use]
    pub fn reports(&self) -> Vec<SheetReport> {
        self.reports.snapshot()
    }

    /// Number of `flush()` calls.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes.len()
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &SheetReport) -> anyhow::Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flushes.push(());
        Ok(())
    }
}

/// Progress sink that records every event.
#[derive(Debug)]
pub struct MockProgressSink {
    events: Log<ProgressEvent>,
}

impl MockProgressSink {
    /// Creates a sink with no events.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Log::new() }
    }

    /// Events received so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.snapshot()
    }

    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    /// Number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Started { .. }))
    }

    /// Number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Completed { .. }))
    }

    /// Number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Skipped { .. }))
    }

    /// `(graded, rejected, skipped)` from the `Finished` event, if one arrived.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().into_iter().find_map(|e| match e {
            ProgressEvent::Finished {
                graded,
                rejected,
                skipped,
            } => Some((graded, rejected, skipped)),
            _ => None,
        })
    }

    /// Reports carried by `Completed` events, in order.
    #[must_use]
    pub fn completed_reports(&self) -> Vec<SheetReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Completed { report } => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.push(event);
    }
}
