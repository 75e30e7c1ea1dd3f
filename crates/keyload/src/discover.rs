//! Sketch discovery.

use std::path::{Path, PathBuf};

use crate::KeyloadError;

/// Finds the first `.ino` file under `root`.
///
/// Files of a directory are checked before its subdirectories; entries are
/// visited in name order so the result is stable across platforms.
pub fn find_sketch(root: &Path) -> Result<Option<PathBuf>, KeyloadError> {
    let mut entries = std::fs::read_dir(root)
        .map_err(|e| KeyloadError::io(root, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| KeyloadError::io(root, e))?;
    entries.sort_by_key(|e| e.file_name());

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| KeyloadError::io(&path, e))?;

        if file_type.is_dir() {
            dirs.push(path);
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "ino") {
            return Ok(Some(path));
        }
    }

    for dir in dirs {
        if let Some(found) = find_sketch(&dir)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
