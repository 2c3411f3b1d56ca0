//! Sheet images from the filesystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bubble_grade_core::{ImageInfo, ImageSource};
use tracing::{debug, warn};

/// Extensions the image decoder is built for, compared case-insensitively.
const SHEET_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Image source over files and directories given on the command line.
///
/// Named files are used as given. Directory entries are visited in name
/// order so batch output is stable; hidden entries are ignored.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to descend into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Every sheet file the source would load, in load order.
    #[must_use]
    pub fn sheet_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                walk(path, self.recursive, &mut files);
            } else if !path.exists() {
                warn!("Path does not exist: {}", path.display());
            } else if is_sheet_file(path) {
                files.push(path.clone());
            } else {
                warn!("Unsupported file type: {}", path.display());
            }
        }
        files
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<ImageInfo>> + Send + '_> {
        let files = self.sheet_files();
        debug!("Found {} sheet images", files.len());
        Box::new(files.into_iter().map(|path| load_sheet(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.sheet_files().len())
    }
}

fn walk(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| !is_hidden(p))
            .collect(),
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                walk(&path, recursive, files);
            }
        } else if is_sheet_file(&path) {
            files.push(path);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn is_sheet_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SHEET_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
}

/// Decodes one sheet image.
fn load_sheet(path: &Path) -> Result<ImageInfo> {
    let image =
        image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
    Ok(ImageInfo::new(path.to_string_lossy(), image))
}
