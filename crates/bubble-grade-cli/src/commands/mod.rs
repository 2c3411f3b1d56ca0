//! CLI command definitions and handlers.

pub mod detect;
pub mod grade;

use std::io::IsTerminal;
use std::path::PathBuf;

use bubble_grade_core::stages::{AnswerConfig, GridConfig, MarkerConfig, PreflightConfig};
use bubble_grade_core::GraderConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::config::AppConfig;

/// Bubble Grade - Grade photographed multiple-choice answer sheets
#[derive(Parser)]
#[command(name = "bubble-grade")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared grade arguments (key, paths, thresholds, flags).
    #[command(flatten)]
    pub grade: grade::GradeArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Grade sheets against an answer key
    Grade(grade::GradeArgs),
    /// Report markers and grid geometry without grading
    Detect(detect::DetectArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every sheet was processed successfully.
    Success = 0,
    /// At least one sheet was rejected.
    SheetsRejected = 1,
    /// The command could not run.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse and validate a quality floor (0-100).
fn parse_quality(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=100"))
    }
}

/// Arguments shared by every command that reads sheet images.
#[derive(Args, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SheetArgs {
    /// Sheet images or directories of them
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Luma level below which a pixel counts as ink (0-255)
    #[arg(long, value_name = "LEVEL")]
    pub dark_threshold: Option<u8>,

    /// Marker quality a grid must exceed (0-100)
    #[arg(long, value_parser = parse_quality)]
    pub min_quality: Option<f32>,

    /// Skip the image size and brightness check
    #[arg(long)]
    pub no_preflight: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,
}

impl SheetArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Flags can only switch behaviour on; a flag that was not passed leaves
    /// the config value in charge.
    fn apply_config(&mut self, config: &AppConfig) {
        if !self.recursive {
            self.recursive = config.general.recursive.unwrap_or(false);
        }
        if !self.no_preflight {
            if let Some(enabled) = config.preflight.enabled {
                self.no_preflight = !enabled;
            }
        }

        self.dark_threshold = self.dark_threshold.or(config.markers.dark_threshold);
        self.min_quality = self.min_quality.or(config.grid.min_quality);

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }
    }

    /// Builds the stage settings: CLI values, then config, then defaults.
    fn grader_config(&self, config: &AppConfig, answers: AnswerConfig) -> GraderConfig {
        let (p, m, g) = (&config.preflight, &config.markers, &config.grid);
        let preflight = PreflightConfig::default();
        let markers = MarkerConfig::default();
        let grid = GridConfig::default();

        GraderConfig {
            preflight: PreflightConfig {
                enabled: !self.no_preflight,
                min_width: p.min_width.unwrap_or(preflight.min_width),
                min_height: p.min_height.unwrap_or(preflight.min_height),
                min_mean: p.min_mean.unwrap_or(preflight.min_mean),
                min_dark_fraction: p.min_dark_fraction.unwrap_or(preflight.min_dark_fraction),
            },
            markers: MarkerConfig {
                dark_threshold: self.dark_threshold.unwrap_or(markers.dark_threshold),
                sample_stride: m.sample_stride.unwrap_or(markers.sample_stride),
                min_region_samples: m.min_region_samples.unwrap_or(markers.min_region_samples),
                min_aspect: m.min_aspect.unwrap_or(markers.min_aspect),
                max_aspect: m.max_aspect.unwrap_or(markers.max_aspect),
                min_area: m.min_area.unwrap_or(markers.min_area),
            },
            grid: GridConfig {
                min_marker_size: g.min_marker_size.unwrap_or(grid.min_marker_size),
                max_marker_size: g.max_marker_size.unwrap_or(grid.max_marker_size),
                min_grid_size: g.min_grid_size.unwrap_or(grid.min_grid_size),
                min_aspect: g.min_aspect.unwrap_or(grid.min_aspect),
                max_aspect: g.max_aspect.unwrap_or(grid.max_aspect),
                min_quality: self.min_quality.unwrap_or(grid.min_quality),
                quality_penalty: g.quality_penalty.unwrap_or(grid.quality_penalty),
            },
            answers,
        }
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Whether to draw a progress bar instead of per-sheet lines.
    fn show_bar(&self) -> bool {
        !self.quiet && (self.progress || std::io::stderr().is_terminal())
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
