//! Collections on disk
//!
//! A collection is a subdirectory: under the data root it holds the source
//! files, under the storage root it holds the persisted index.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Names of the subdirectories of `root`, sorted. A missing root has none.
pub fn list_collections(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Files directly inside `dir` whose extension is `extension`, sorted
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::CollectionNotFound(dir.display().to_string()));
    }

    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walk_error)?;
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    debug!("Found {} .{} files in {}", files.len(), extension, dir.display());
    Ok(files)
}

/// Whether any collection has been persisted under the storage root
pub fn has_collections(storage_root: &Path) -> Result<bool> {
    Ok(!list_collections(storage_root)?.is_empty())
}

/// Delete the whole storage root, if present
pub async fn remove_storage(storage_root: &Path) -> Result<()> {
    if tokio::fs::try_exists(storage_root).await? {
        tokio::fs::remove_dir_all(storage_root).await?;
        info!("Removed vector storage at {}", storage_root.display());
    }
    Ok(())
}

fn walk_error(e: walkdir::Error) -> Error {
    match e.into_io_error() {
        Some(io) => Error::Io(io),
        None => Error::Other("filesystem loop while listing collections".to_string()),
    }
}
