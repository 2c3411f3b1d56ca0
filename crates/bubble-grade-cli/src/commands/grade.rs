//! Grade command - score answer sheets against a key.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bubble_grade_adapters::{load_answer_key, FsImageSource};
use bubble_grade_core::domain::{KeyParseError, MAX_OPTIONS};
use bubble_grade_core::stages::AnswerConfig;
use bubble_grade_core::{
    AnswerKey, GraderConfig, ImageInfo, ImageSource, ProgressEvent, ProgressSink, ResultOutput,
    SheetGrader, SheetOutcome, SheetReport,
};
use clap::Args;
use tracing::info;

use super::{iso_timestamp, parse_threshold, ExitCode, SheetArgs};
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

fn parse_key(s: &str) -> Result<AnswerKey, String> {
    s.parse().map_err(|e: KeyParseError| e.to_string())
}

fn parse_options(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a whole number"))?;
    if (2..=MAX_OPTIONS).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 2..={MAX_OPTIONS}"))
    }
}

fn parse_columns(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("columns must be at least 1".into()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{s}' is not a whole number")),
    }
}

/// Arguments for grading sheets.
#[derive(Args, Clone)]
pub struct GradeArgs {
    /// Paths, detection thresholds, and output flags.
    #[command(flatten)]
    pub sheets: SheetArgs,

    /// Answer key file (.json, or plain letters in any other file)
    #[arg(short, long, value_name = "FILE", conflicts_with = "answers")]
    pub key: Option<PathBuf>,

    /// Answer key given inline, e.g. ABCDA
    #[arg(short, long, value_name = "LETTERS", value_parser = parse_key)]
    pub answers: Option<AnswerKey>,

    /// Options per question (2-8)
    #[arg(long, value_parser = parse_options)]
    pub options: Option<usize>,

    /// Fill fraction above which a bubble counts as marked (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub fill_threshold: Option<f32>,

    /// Side-by-side question blocks on the sheet
    #[arg(long, value_parser = parse_columns)]
    pub columns: Option<usize>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: AppConfig,
}

impl GradeArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in `grader_config`)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.sheets.apply_config(config);

        args.options = args.options.or(config.answers.options);
        args.fill_threshold = args.fill_threshold.or(config.answers.fill_threshold);
        args.columns = args.columns.or(config.answers.columns);

        args.config = config.clone();
        args
    }

    /// Answer key from `--answers`, `--key`, or the config `[key]` section.
    ///
    /// # Errors
    ///
    /// Returns an error when no key is given or the key cannot be read.
    pub fn resolve_key(&self) -> Result<AnswerKey> {
        if let Some(key) = &self.answers {
            return Ok(key.clone());
        }
        if let Some(path) = self.key.as_ref().or(self.config.key.file.as_ref()) {
            return load_answer_key(path);
        }
        if let Some(letters) = &self.config.key.answers {
            return letters
                .parse::<AnswerKey>()
                .context("Invalid key.answers in configuration");
        }
        anyhow::bail!("No answer key given. Use --key FILE or --answers LETTERS.")
    }

    /// Stage settings for this run.
    #[must_use]
    pub fn grader_config(&self) -> GraderConfig {
        let defaults = AnswerConfig::default();
        let answers = AnswerConfig {
            options: self.options.unwrap_or(defaults.options),
            fill_threshold: self.fill_threshold.unwrap_or(defaults.fill_threshold),
            cell_margin: self
                .config
                .answers
                .cell_margin
                .unwrap_or(defaults.cell_margin),
            columns: self.columns.unwrap_or(defaults.columns),
        };
        self.sheets.grader_config(&self.config, answers)
    }
}

/// Result of running the grade command.
#[derive(Debug)]
pub struct GradeSummary {
    /// Sheets scored against the key.
    pub graded: usize,
    /// Sheets rejected by the pipeline.
    pub rejected: usize,
    /// Images that could not be loaded.
    pub skipped: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the grade command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
///
/// # Errors
///
/// Returns an error for a missing or invalid key, an invalid layout, no
/// sheet images, or a failed write.
pub fn run(args: &GradeArgs) -> Result<GradeSummary> {
    info!("Running grade command on {} paths", args.sheets.paths.len());

    if args.sheets.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let key = args.resolve_key()?;
    let grader = SheetGrader::new(args.grader_config());
    let layout = &grader.config().answers;
    layout.validate()?;
    if key.options_used() > layout.options {
        anyhow::bail!(
            "Answer key uses {} options but sheets have {}; pass --options",
            key.options_used(),
            layout.options
        );
    }

    let source = FsImageSource::new(args.sheets.paths.clone(), args.sheets.recursive);
    let total = source.count_hint();
    if total == Some(0) {
        anyhow::bail!("No sheet images found");
    }

    let progress = ProgressBar::new(
        total.map(|t| t as u64),
        args.sheets.quiet,
        args.sheets.show_bar(),
    );
    let output = JsonOutput::stdout(args.sheets.format(), args.sheets.pretty);

    grade_sheets(&source, &grader, &key, &output, &progress)
}

/// Builds the report for one sheet; grading failures become rejections.
fn grade_sheet(grader: &SheetGrader, key: &AnswerKey, image: &ImageInfo) -> SheetReport {
    let outcome = match grader.grade(image, key) {
        Ok(result) => SheetOutcome::Graded { result },
        Err(e) => {
            info!("Rejected {}: {e}", image.path);
            SheetOutcome::Rejected {
                kind: e.kind(),
                reason: e.to_string(),
            }
        }
    };

    SheetReport {
        path: image.path.clone(),
        timestamp: iso_timestamp(),
        dimensions: image.dimensions(),
        outcome,
    }
}

/// Grades every image from `source` and writes one report per sheet.
fn grade_sheets(
    source: &dyn ImageSource,
    grader: &SheetGrader,
    key: &AnswerKey,
    output: &dyn ResultOutput,
    progress: &dyn ProgressSink,
) -> Result<GradeSummary> {
    let total = source.count_hint();
    let mut graded = 0usize;
    let mut rejected = 0usize;
    let mut skipped = 0usize;

    for (index, image_result) in source.images().enumerate() {
        let image = match image_result {
            Ok(img) => img,
            Err(e) => {
                // Note: error message contains the path via anyhow context
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("image {index}"),
                    reason: format!("{e:#}"),
                });
                skipped += 1;
                continue;
            }
        };

        progress.on_event(ProgressEvent::Started {
            path: image.path.clone(),
            index,
            total,
        });

        let report = grade_sheet(grader, key, &image);
        if report.is_graded() {
            graded += 1;
        } else {
            rejected += 1;
        }

        output.write(&report)?;
        progress.on_event(ProgressEvent::Completed { report });
    }

    output.flush()?;

    progress.on_event(ProgressEvent::Finished {
        graded,
        rejected,
        skipped,
    });

    let exit_code = if rejected + skipped > 0 {
        ExitCode::SheetsRejected
    } else {
        ExitCode::Success
    };

    Ok(GradeSummary {
        graded,
        rejected,
        skipped,
        exit_code,
    })
}
