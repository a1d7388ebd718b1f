//! Host helper: turns a folder on disk into import entries.

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{ReadDir, read_dir};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, spawn};

use crate::classify::is_ignorable;
use crate::error::{Error, Result};
use crate::path_utils::{compare_natural, join};
use crate::types::FileEntry;

/// Maximum number of files read at the same time.
const MAX_CONCURRENT_READS: usize = 16;

/// Walks `root` and reads every non-ignorable file into a [`FileEntry`].
///
/// Entry paths start with the name of `root` itself, so `~/manga/One Piece` yields
/// paths such as `One Piece/v01/001.jpg`, exactly what a drag-and-drop of that
/// folder would produce.
///
/// # Arguments
///
/// * `root` - The folder to scan
///
/// # Returns
///
/// * `Ok(Vec<FileEntry>)` - All files, in natural path order
/// * `Err(Error::InvalidPath)` - `root` is not a directory
/// * `Err(Error::Io)` - A directory or file could not be read
pub async fn collect_entries(root: &Path) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        return Err(Error::InvalidPath(
            root.to_string_lossy().to_string(),
            "Source path is not a directory.".to_string(),
        ));
    }
    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    let mut directories: Vec<(String, PathBuf)> = vec![(root_name, root.to_path_buf())];

    while let Some((relative, directory)) = directories.pop() {
        let mut paths: ReadDir = read_dir(&directory).await?;
        while let Some(entry) = paths.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let child = join(&relative, &name);
            if is_ignorable(&child) {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                directories.push((child, entry.path()));
            } else {
                files.push((child, entry.path()));
            }
        }
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_READS));
    let handles: Vec<JoinHandle<Result<FileEntry>>> = files
        .into_iter()
        .map(|(relative, path)| {
            let semaphore = Arc::clone(&semaphore);
            spawn(async move {
                let _permit = semaphore.acquire().await?;
                let content = tokio::fs::read(&path).await?;
                Ok(FileEntry::new(relative, content))
            })
        })
        .collect();

    let mut entries = try_join_all(handles)
        .await
        .map_err(|e| Error::AsyncTaskError(format!("Failed to join file reads: {}", e)))?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    entries.sort_by(|a, b| compare_natural(&a.path, &b.path));
    Ok(entries)
}
