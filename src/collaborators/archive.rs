use crate::classify::is_ignorable;
use crate::collaborators::Decompressor;
use crate::error::{Error, Result};
use crate::path_utils::extension;
use crate::types::FileEntry;
use async_trait::async_trait;
use std::io::{Cursor, Read};
use tokio::task::spawn_blocking;
use zip::ZipArchive;

/// Archive extensions the zip reader understands.
const ZIP_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// Decompressor for zip-based archives (`.zip`, `.cbz`).
///
/// Directory members and ignorable files (`__MACOSX/`, `.DS_Store`, ...) are dropped.
/// Other archive formats are rejected with [`Error::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipDecompressor;

impl ZipDecompressor {
    pub fn new() -> Self {
        Self
    }

    fn read_entries(path: &str, bytes: &[u8]) -> Result<Vec<FileEntry>> {
        let failed = |reason: String| Error::Decompression {
            path: path.to_string(),
            reason,
        };

        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| failed(e.to_string()))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut member = archive.by_index(index).map_err(|e| failed(e.to_string()))?;
            if member.is_dir() {
                continue;
            }
            let name = member.name().to_string();
            if is_ignorable(&name) {
                continue;
            }

            let mut content = Vec::with_capacity(member.size() as usize);
            member
                .read_to_end(&mut content)
                .map_err(|e| failed(format!("{}: {}", name, e)))?;
            entries.push(FileEntry::new(name, content));
        }

        Ok(entries)
    }
}

#[async_trait]
impl Decompressor for ZipDecompressor {
    async fn decompress(&self, archive: &FileEntry) -> Result<Vec<FileEntry>> {
        let supported = extension(&archive.path)
            .is_some_and(|ext| ZIP_EXTENSIONS.contains(&ext.as_str()));
        if !supported {
            return Err(Error::Unsupported(format!(
                "Archive format of '{}' is not supported",
                archive.path
            )));
        }

        let path = archive.path.clone();
        let content = archive.content.clone();
        spawn_blocking(move || Self::read_entries(&path, content.bytes()))
            .await
            .map_err(|e| Error::AsyncTaskError(e.to_string()))?
    }
}
