//! Progress reporting on stderr using indicatif.

use std::sync::{Mutex, PoisonError};

use bubble_grade_core::{ProgressEvent, ProgressSink, SheetOutcome};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Running score total for the bar message.
#[derive(Debug, Default)]
struct Tally {
    graded: u32,
    score_sum: u32,
}

impl Tally {
    fn record(&mut self, score: u32) {
        self.graded += 1;
        self.score_sum += score;
    }

    fn mean(&self) -> Option<u32> {
        (self.graded > 0).then(|| self.score_sum / self.graded)
    }
}

/// Progress adapter for grading runs.
///
/// With a bar, the message shows the mean score of sheets graded so far.
/// Without one, each rejected sheet gets a line on stderr.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
    tally: Mutex<Tally>,
}

impl ProgressBar {
    /// Creates a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of sheets, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise print rejected sheets
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        let bar = (!quiet && show_bar).then(|| {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            bar,
            quiet,
            tally: Mutex::new(Tally::default()),
        }
    }

    fn mean_score(&self) -> Option<u32> {
        self.tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mean()
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { report } => match &report.outcome {
                SheetOutcome::Graded { result } => {
                    self.tally
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record(result.score);
                    if let Some(bar) = &self.bar {
                        bar.inc(1);
                    }
                }
                SheetOutcome::Rejected { reason, .. } => {
                    if let Some(bar) = &self.bar {
                        bar.inc(1);
                    } else {
                        eprintln!("{}: rejected: {reason}", report.path);
                    }
                }
            },
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Finished {
                graded,
                rejected,
                skipped,
            } => {
                if let Some(bar) = &self.bar {
                    let mean = self
                        .mean_score()
                        .map_or_else(String::new, |m| format!(", mean score {m}%"));
                    bar.finish_with_message(format!(
                        "Done: {graded} graded, {rejected} rejected, {skipped} skipped{mean}"
                    ));
                }
            }
        }
    }
}
