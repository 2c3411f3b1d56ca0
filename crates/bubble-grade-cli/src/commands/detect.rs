//! Detect command - report markers and grid geometry without a key.

use anyhow::Result;
use bubble_grade_adapters::FsImageSource;
use bubble_grade_core::stages::AnswerConfig;
use bubble_grade_core::{
    ErrorKind, ImageDimensions, ImageInfo, ImageSource, ResultOutput, SheetDetection, SheetGrader,
};
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{iso_timestamp, ExitCode, SheetArgs};
use crate::config::AppConfig;
use crate::output::JsonOutput;

/// Arguments for marker detection.
#[derive(Args, Clone)]
pub struct DetectArgs {
    /// Paths, detection thresholds, and output flags.
    #[command(flatten)]
    pub sheets: SheetArgs,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: AppConfig,
}

impl DetectArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.sheets.apply_config(config);
        args.config = config.clone();
        args
    }
}

/// Detection report for one image.
#[derive(Debug, Serialize)]
pub struct DetectionReport {
    /// Path to the sheet image.
    pub path: String,
    /// Timestamp of processing (ISO 8601).
    pub timestamp: String,
    /// Image dimensions.
    pub dimensions: ImageDimensions,
    /// What was found.
    #[serde(flatten)]
    pub outcome: DetectionOutcome,
}

/// Outcome of marker detection on one image.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// Four markers were found; the grid may still have failed validation.
    Detected {
        /// Markers, grid, and validation.
        #[serde(flatten)]
        detection: SheetDetection,
    },
    /// Preflight failed or markers were missing.
    Rejected {
        /// Coarse error category.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },
}

impl DetectionReport {
    /// True when markers were found and the grid passed validation.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(
            &self.outcome,
            DetectionOutcome::Detected { detection } if detection.validation.is_valid()
        )
    }
}

fn detect_sheet(grader: &SheetGrader, image: &ImageInfo) -> DetectionReport {
    let outcome = match grader.detect(image) {
        Ok(detection) => DetectionOutcome::Detected { detection },
        Err(e) => DetectionOutcome::Rejected {
            kind: e.kind(),
            reason: e.to_string(),
        },
    };
    DetectionReport {
        path: image.path.clone(),
        timestamp: iso_timestamp(),
        dimensions: image.dimensions(),
        outcome,
    }
}

/// Run the detect command.
///
/// # Errors
///
/// Returns an error when no paths or images are given or output fails.
pub fn run(args: &DetectArgs) -> Result<ExitCode> {
    info!("Running detect command on {} paths", args.sheets.paths.len());

    if args.sheets.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let grader = SheetGrader::new(
        args.sheets
            .grader_config(&args.config, AnswerConfig::default()),
    );
    let source = FsImageSource::new(args.sheets.paths.clone(), args.sheets.recursive);
    if source.count_hint() == Some(0) {
        anyhow::bail!("No sheet images found");
    }
    let output = JsonOutput::stdout(args.sheets.format(), args.sheets.pretty);

    let mut all_usable = true;
    for image in source.images() {
        let image = match image {
            Ok(img) => img,
            Err(e) => {
                if !args.sheets.quiet {
                    eprintln!("WARN: Skipping: {e:#}");
                }
                all_usable = false;
                continue;
            }
        };

        let report = detect_sheet(&grader, &image);
        all_usable &= report.is_usable();
        output.emit(&report)?;
    }
    output.flush()?;

    Ok(if all_usable {
        ExitCode::Success
    } else {
        ExitCode::SheetsRejected
    })
}
