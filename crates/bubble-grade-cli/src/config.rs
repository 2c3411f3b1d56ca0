//! Configuration file support for bubble-grade.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/bubble-grade/config.toml` (lowest priority)
//! - Project-local: `.bubble-grade.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use bubble_grade_core::domain::MAX_OPTIONS;
use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Image size and brightness checks.
    pub preflight: PreflightConfig,
    /// Corner marker detection.
    pub markers: MarkersConfig,
    /// Grid geometry tolerances.
    pub grid: GridConfig,
    /// Bubble layout and fill threshold.
    pub answers: AnswersConfig,
    /// Default answer key.
    pub key: KeyConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Preflight check configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Enable/disable the preflight check.
    pub enabled: Option<bool>,
    /// Minimum image width in pixels.
    pub min_width: Option<u32>,
    /// Minimum image height in pixels.
    pub min_height: Option<u32>,
    /// Minimum mean luma (0-255).
    pub min_mean: Option<f64>,
    /// Minimum fraction of dark pixels (0.0-1.0).
    pub min_dark_fraction: Option<f64>,
}

/// Marker detection configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    /// Luma level below which a pixel is dark (0-255).
    pub dark_threshold: Option<u8>,
    /// Sampling step in pixels.
    pub sample_stride: Option<u32>,
    /// Minimum samples per region.
    pub min_region_samples: Option<usize>,
    /// Minimum marker width / height ratio.
    pub min_aspect: Option<f32>,
    /// Maximum marker width / height ratio.
    pub max_aspect: Option<f32>,
    /// Minimum marker area in pixels.
    pub min_area: Option<u64>,
}

/// Grid validation configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Smallest accepted marker size in pixels.
    pub min_marker_size: Option<u32>,
    /// Largest accepted marker size in pixels.
    pub max_marker_size: Option<u32>,
    /// Smallest accepted grid side in pixels.
    pub min_grid_size: Option<u32>,
    /// Minimum grid width / height ratio.
    pub min_aspect: Option<f32>,
    /// Maximum grid width / height ratio.
    pub max_aspect: Option<f32>,
    /// Quality must exceed this value (0-100).
    pub min_quality: Option<f32>,
    /// Quality points lost per unit of marker size variance.
    pub quality_penalty: Option<f32>,
}

/// Answer reading configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AnswersConfig {
    /// Options per question (2-8).
    pub options: Option<usize>,
    /// Fill fraction above which an option is marked (0.0-1.0).
    pub fill_threshold: Option<f32>,
    /// Cell inset on every side (0.0-0.5).
    pub cell_margin: Option<f32>,
    /// Side-by-side question blocks.
    pub columns: Option<usize>,
}

/// Default answer key.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Path to an answer key file.
    pub file: Option<PathBuf>,
    /// Inline answer letters.
    pub answers: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

fn check_range<T>(name: &str, value: Option<T>, min: T, max: T) -> Result<(), String>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    match value {
        Some(v) if v < min || v > max => Err(format!("{name} must be {min}-{max}, got {v}")),
        _ => Ok(()),
    }
}

fn check_order<T>(name: &str, min: Option<T>, max: Option<T>) -> Result<(), String>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => {
            Err(format!("{name}: min_aspect {lo} exceeds max_aspect {hi}"))
        }
        _ => Ok(()),
    }
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/bubble-grade/config.toml`
    /// 2. Project-local: `.bubble-grade.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        let p = &self.preflight;
        check_range("preflight.min_mean", p.min_mean, 0.0, 255.0)?;
        check_range("preflight.min_dark_fraction", p.min_dark_fraction, 0.0, 1.0)?;

        let m = &self.markers;
        check_range("markers.sample_stride", m.sample_stride, 1, 64)?;
        check_order("markers", m.min_aspect, m.max_aspect)?;

        let g = &self.grid;
        check_range("grid.min_quality", g.min_quality, 0.0, 100.0)?;
        check_order("grid", g.min_aspect, g.max_aspect)?;
        if let (Some(lo), Some(hi)) = (g.min_marker_size, g.max_marker_size) {
            if lo > hi {
                return Err(format!(
                    "grid.min_marker_size {lo} exceeds grid.max_marker_size {hi}"
                ));
            }
        }

        let a = &self.answers;
        check_range("answers.options", a.options, 2, MAX_OPTIONS)?;
        check_range("answers.fill_threshold", a.fill_threshold, 0.0, 1.0)?;
        check_range("answers.cell_margin", a.cell_margin, 0.0, 0.49)?;
        check_range("answers.columns", a.columns, 1, 16)?;

        if self.key.file.is_some() && self.key.answers.is_some() {
            return Err("key.file and key.answers are both set; key.file is used".into());
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        let (p, op) = (&mut self.preflight, other.preflight);
        p.enabled = op.enabled.or(p.enabled);
        p.min_width = op.min_width.or(p.min_width);
        p.min_height = op.min_height.or(p.min_height);
        p.min_mean = op.min_mean.or(p.min_mean);
        p.min_dark_fraction = op.min_dark_fraction.or(p.min_dark_fraction);

        let (m, om) = (&mut self.markers, other.markers);
        m.dark_threshold = om.dark_threshold.or(m.dark_threshold);
        m.sample_stride = om.sample_stride.or(m.sample_stride);
        m.min_region_samples = om.min_region_samples.or(m.min_region_samples);
        m.min_aspect = om.min_aspect.or(m.min_aspect);
        m.max_aspect = om.max_aspect.or(m.max_aspect);
        m.min_area = om.min_area.or(m.min_area);

        let (g, og) = (&mut self.grid, other.grid);
        g.min_marker_size = og.min_marker_size.or(g.min_marker_size);
        g.max_marker_size = og.max_marker_size.or(g.max_marker_size);
        g.min_grid_size = og.min_grid_size.or(g.min_grid_size);
        g.min_aspect = og.min_aspect.or(g.min_aspect);
        g.max_aspect = og.max_aspect.or(g.max_aspect);
        g.min_quality = og.min_quality.or(g.min_quality);
        g.quality_penalty = og.quality_penalty.or(g.quality_penalty);

        let (a, oa) = (&mut self.answers, other.answers);
        a.options = oa.options.or(a.options);
        a.fill_threshold = oa.fill_threshold.or(a.fill_threshold);
        a.cell_margin = oa.cell_margin.or(a.cell_margin);
        a.columns = oa.columns.or(a.columns);

        // A key from a closer config replaces the whole key, in either form.
        if other.key.file.is_some() || other.key.answers.is_some() {
            self.key = other.key;
        }

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bubble-grade").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.bubble-grade.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".bubble-grade.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
///
/// A relative `key.file` is resolved against the directory holding the
/// config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(mut config) => {
            if let (Some(file), Some(dir)) = (config.key.file.as_mut(), path.parent()) {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
            Some(config)
        }
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.answers.options.is_none());
        assert!(config.grid.min_quality.is_none());
        assert!(config.key.file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[general]
recursive = true

[preflight]
enabled = false
min_width = 300
min_height = 400
min_mean = 50.0
min_dark_fraction = 0.01

[markers]
dark_threshold = 90
sample_stride = 2
min_region_samples = 12
min_aspect = 0.6
max_aspect = 1.8
min_area = 150

[grid]
min_marker_size = 25
max_marker_size = 150
min_grid_size = 120
min_aspect = 0.5
max_aspect = 2.5
min_quality = 60.0
quality_penalty = 8.0

[answers]
options = 4
fill_threshold = 0.4
cell_margin = 0.15
columns = 2

[key]
file = '/srv/keys/midterm.txt'

[output]
format = 'json'
pretty = true
progress = false
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.general.recursive, Some(true));
        assert_eq!(config.preflight.enabled, Some(false));
        assert_eq!(config.preflight.min_height, Some(400));
        assert_eq!(config.markers.dark_threshold, Some(90));
        assert_eq!(config.markers.min_area, Some(150));
        assert_eq!(config.grid.min_quality, Some(60.0));
        assert_eq!(config.answers.options, Some(4));
        assert_eq!(config.answers.columns, Some(2));
        assert_eq!(
            config.key.file.as_deref(),
            Some(Path::new("/srv/keys/midterm.txt"))
        );
        assert_eq!(config.output.format.as_deref(), Some("json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_overrides_and_preserves() {
        let mut base: AppConfig = toml::from_str(
            r"
[answers]
options = 5
fill_threshold = 0.3

[grid]
min_quality = 40.0
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[answers]
options = 4

[markers]
dark_threshold = 100
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.answers.options, Some(4));
        assert_eq!(base.answers.fill_threshold, Some(0.3));
        assert_eq!(base.grid.min_quality, Some(40.0));
        assert_eq!(base.markers.dark_threshold, Some(100));
    }

    #[test]
    fn test_merge_replaces_key_as_a_whole() {
        let mut base: AppConfig = toml::from_str("[key]\nfile = 'home-key.txt'\n").unwrap();
        let project: AppConfig = toml::from_str("[key]\nanswers = 'ABCD'\n").unwrap();

        base.merge(project);

        assert!(base.key.file.is_none());
        assert_eq!(base.key.answers.as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str("[key]\nanswers = 'AB'\n[output]\npretty = true\n")
            .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.key.answers.as_deref(), Some("AB"));
        assert_eq!(base.output.pretty, Some(true));
    }

    #[test]
    fn test_invalid_toml_syntax_handled() {
        let result: Result<AppConfig, _> = toml::from_str("[answers\noptions = 4\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let result: Result<AppConfig, _> = toml::from_str("[answers]\noptions = 'five'\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_options_range() {
        let mut config = AppConfig::default();
        config.answers.options = Some(9);
        let err = config.validate().unwrap_err();
        assert!(err.contains("answers.options"));

        config.answers.options = Some(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_fill_threshold_range() {
        let mut config = AppConfig::default();
        config.answers.fill_threshold = Some(1.5);
        assert!(config
            .validate()
            .unwrap_err()
            .contains("answers.fill_threshold"));
    }

    #[test]
    fn test_validate_aspect_order() {
        let mut config = AppConfig::default();
        config.grid.min_aspect = Some(2.0);
        config.grid.max_aspect = Some(1.0);
        assert!(config.validate().unwrap_err().starts_with("grid:"));
    }

    #[test]
    fn test_validate_output_format() {
        let mut config = AppConfig::default();
        config.output.format = Some("csv".into());
        assert!(config.validate().unwrap_err().contains("output.format"));
    }

    #[test]
    fn test_validate_conflicting_key() {
        let mut config = AppConfig::default();
        config.key.file = Some(PathBuf::from("key.txt"));
        config.key.answers = Some("AB".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".bubble-grade.toml"), "").unwrap();

        let found = find_config_in_parents(&nested).expect("found in ancestor");
        assert_eq!(found, dir.path().join(".bubble-grade.toml"));
    }

    #[test]
    fn test_relative_key_file_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".bubble-grade.toml");
        std::fs::write(&path, "[key]\nfile = 'keys/final.txt'\n").unwrap();

        let config = load_file(&path).expect("loads");
        assert_eq!(config.key.file, Some(dir.path().join("keys/final.txt")));
    }
}
