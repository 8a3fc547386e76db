//! Input collection: which images go into the document, and in what order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// File suffixes recognized as images (matched case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Whether the path carries a recognized image suffix.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// All image files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. An empty result is not an error.
pub fn collect_from_dir(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let collect_error = |e: std::io::Error| Error::Collect {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };

    let mut images = Vec::new();
    for entry in fs::read_dir(dir).map_err(collect_error)? {
        let path = entry.map_err(collect_error)?.path();
        if path.is_file() && is_image_path(&path) {
            images.push(path);
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} images in {}", images.len(), dir.display());

    Ok(images)
}

/// An explicit selection, kept in the order it was given.
pub fn collect_from_list<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths.into_iter().map(Into::into).collect()
}
