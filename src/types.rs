//! Core data types for the Yomikomi import pipeline.
//!
//! This module defines the fundamental data structures used throughout the crate:
//! - Input units (`Blob`, `FileEntry`, `FileKind`)
//! - Pairing results (`Source`, `PairedSource`, `PairingResult`, `Routing`)
//! - Matcher output (`ImageMatchResult`)
//! - Persistable records (`VolumeMetadata`, `OcrPage`, `ProcessedVolume`)
//! - Batch reporting (`ImportResult`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::metadata::MetadataPage;
use crate::path_utils::{file_name, normalize_separators};

/// Opaque, cheaply clonable byte content of a file.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<[u8]>,
    placeholder: bool,
}

impl Blob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            placeholder: false,
        }
    }

    /// Wraps synthesized filler content standing in for a missing page image.
    pub fn placeholder(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
            placeholder: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The "file missing" marker carried by synthesized placeholder pages.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.bytes.len())
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob::new(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Blob::new(bytes)
    }
}

impl<const N: usize> From<&[u8; N]> for Blob {
    fn from(bytes: &[u8; N]) -> Self {
        Blob::new(&bytes[..])
    }
}

impl From<&str> for Blob {
    fn from(text: &str) -> Self {
        Blob::new(text.as_bytes())
    }
}

/// An immutable input unit: a forward-slash path plus its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: Blob,
}

impl FileEntry {
    /// Creates an entry, normalizing the path to forward-slash segments.
    pub fn new(path: impl AsRef<str>, content: impl Into<Blob>) -> Self {
        Self {
            path: normalize_separators(path.as_ref()),
            content: content.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Category assigned to a single path by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Metadata,
    Image,
    Archive,
    Ignorable,
}

/// Discriminant of [`Source`], used in logs and identifier derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Directory,
    Archive,
    TocDirectory,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Directory => "directory",
            SourceKind::Archive => "archive",
            SourceKind::TocDirectory => "toc-directory",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a volume's images come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A folder holding page images directly, keyed by path relative to the folder.
    Directory { files: BTreeMap<String, Blob> },
    /// A single compressed container, still to be decompressed.
    Archive { archive_file: FileEntry },
    /// A folder whose pages live in chapter subfolders, keyed by chapter name.
    TocDirectory {
        chapters: BTreeMap<String, BTreeMap<String, Blob>>,
    },
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Directory { .. } => SourceKind::Directory,
            Source::Archive { .. } => SourceKind::Archive,
            Source::TocDirectory { .. } => SourceKind::TocDirectory,
        }
    }

    /// Sum of the sizes of all blobs the source holds.
    pub fn estimated_size_bytes(&self) -> u64 {
        match self {
            Source::Directory { files } => files.values().map(|b| b.len() as u64).sum(),
            Source::Archive { archive_file } => archive_file.content.len() as u64,
            Source::TocDirectory { chapters } => chapters
                .values()
                .flat_map(|files| files.values())
                .map(|b| b.len() as u64)
                .sum(),
        }
    }
}

/// A source matched with at most one sidecar file, ready for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSource {
    pub id: Uuid,
    /// The raw sidecar; parsed (and validated) by the volume processor.
    pub metadata_file: Option<FileEntry>,
    pub source: Source,
    pub base_path: String,
    pub estimated_size_bytes: u64,
    pub image_only: bool,
}

/// Output of the pairing engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairingResult {
    pub pairings: Vec<PairedSource>,
    pub warnings: Vec<String>,
}

/// Output of the routing decider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routing {
    pub direct_process: Option<PairedSource>,
    pub queued: Vec<PairedSource>,
}

/// How declared pages resolved against the available image files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMatchResult {
    /// Declared paths that resolved to an image.
    pub matched: Vec<String>,
    /// Declared paths with no image.
    pub missing: Vec<String>,
    /// Available image paths no declared page used.
    pub extra: Vec<String>,
    /// Declared path -> actual path, for every resolution where the two differ.
    pub remapped: BTreeMap<String, String>,
}

impl ImageMatchResult {
    /// Actual file path a declared page resolved to, if any.
    pub fn resolve<'a>(&'a self, declared: &'a str) -> Option<&'a str> {
        if let Some(actual) = self.remapped.get(declared) {
            return Some(actual.as_str());
        }
        self.matched
            .iter()
            .find(|path| path.as_str() == declared)
            .map(|path| path.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Thumbnail produced by the thumbnail collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub content: Blob,
    pub width: u32,
    pub height: u32,
}

/// Diagnostic recorded when declared pages and available images disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMismatch {
    pub expected: usize,
    pub found: usize,
    pub missing_files: Vec<String>,
    /// Images of the source that no declared page uses.
    #[serde(default)]
    pub extra_files: Vec<String>,
}

/// OCR page as persisted; image-only volumes carry one empty page per image.
pub type OcrPage = MetadataPage;

/// Persistable description of one volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    pub volume_id: String,
    pub series_id: String,
    pub series_name: String,
    pub volume_name: String,
    /// Sidecar version; empty for image-only volumes.
    pub metadata_version: String,
    pub page_count: usize,
    pub total_chars: u64,
    /// Running character total after each page.
    pub page_char_counts: Vec<u64>,
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
    pub missing_pages: Vec<String>,
    pub mismatch: Option<ImageMismatch>,
    pub added_on: DateTime<Utc>,
}

impl VolumeMetadata {
    pub fn is_image_only(&self) -> bool {
        self.metadata_version.is_empty()
    }
}

/// Terminal output of the volume processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedVolume {
    pub metadata: VolumeMetadata,
    pub ocr_pages: Vec<OcrPage>,
    /// Page images keyed by the page path the OCR data refers to.
    pub files: BTreeMap<String, Blob>,
    /// Sources discovered inside this one, to be fed back into the queue.
    pub nested_sources: Vec<PairedSource>,
}

impl ProcessedVolume {
    /// A source that only wrapped other sources (e.g. an archive of archives).
    pub fn is_container(&self) -> bool {
        self.metadata.page_count == 0 && !self.nested_sources.is_empty()
    }
}

/// Outcome of one batch import call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported_count: usize,
    pub failed_count: usize,
    /// Sources that yielded no volume of their own (pure containers).
    pub skipped_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
