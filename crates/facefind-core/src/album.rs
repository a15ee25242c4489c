//! Album enumeration: the candidate images in one directory.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions scanned when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

#[derive(Error, Debug)]
pub enum AlbumError {
    #[error("album is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("cannot read album {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Lowercase and strip leading dots, so ".JPG" and "jpg" are the same entry.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = extensions
        .iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// List the files directly inside `album` whose extension is in `extensions`.
///
/// `extensions` must already be normalized. Subdirectories are not entered.
/// The result is sorted by path.
pub fn discover_images(album: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, AlbumError> {
    if !album.is_dir() {
        return Err(AlbumError::NotADirectory(album.to_path_buf()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(album).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|source| AlbumError::Read {
            path: album.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| extensions.iter().any(|e| *e == ext));
        if matches {
            images.push(path.to_path_buf());
        }
    }

    images.sort();

    Ok(images)
}
