//! Yomikomi - mokuro volume import library
//!
//! This crate reconstructs manga volumes from an unstructured bag of files: loose
//! images, folders of images, zip/cbz archives (possibly archives of archives) and
//! optional mokuro OCR sidecars. It decides which sidecar belongs to which images,
//! matches declared pages to actual files, and produces volume records ready to be
//! persisted.
//!
//! # Getting Started
//!
//! Collect the files of one import (from disk, a file picker or a cloud listing) as
//! [`FileEntry`] values and hand them to an [`Importer`]. The importer pairs them,
//! processes every volume and saves it through a [`VolumeStore`](collaborators::VolumeStore).
//!
//! ```rust,no_run
//! use yomikomi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> yomikomi::error::Result<()> {
//!     let config = ImportConfig::builder()
//!         .placeholder_width(800u32)
//!         .placeholder_height(1200u32)
//!         .build()?;
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let importer = Importer::with_defaults(config, store.clone());
//!
//!     let entries = collect_entries(Path::new("./downloads/One Piece")).await?;
//!     let result = importer.import(entries).await;
//!
//!     println!(
//!         "{} imported, {} failed, {} skipped",
//!         result.imported_count, result.failed_count, result.skipped_count
//!     );
//!     for warning in &result.warnings {
//!         println!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The individual stages are public as well: [`pair_sources`] for pairing only,
//! [`matcher::match_images`] for page matching and [`VolumeProcessor`] for processing a
//! single pairing with custom collaborators.

pub mod assembler;
pub mod classify;
pub mod collaborators;
pub mod error;
pub mod importer;
pub mod matcher;
pub mod metadata;
pub mod naming;
pub mod pairing;
pub mod path_utils;
pub mod processor;
pub mod routing;
pub mod scan;
pub mod types;

pub use importer::{ImportConfig, ImportConfigBuilder, Importer};
pub use pairing::pair_sources;
pub use processor::{MaterializedContent, VolumeProcessor};
pub use routing::route;

// Re-export error and core types for direct access
pub use types::{
    Blob, FileEntry, FileKind, ImageMatchResult, ImageMismatch, ImportResult, OcrPage,
    PairedSource, PairingResult, ProcessedVolume, Routing, Source, SourceKind, Thumbnail,
    VolumeMetadata,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing you to
/// import everything you need with a single `use yomikomi::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        Blob, FileEntry, FileKind, ImageMatchResult, ImportConfig, ImportConfigBuilder,
        ImportResult, Importer, MaterializedContent, OcrPage, PairedSource, PairingResult,
        ProcessedVolume, Routing, Source, SourceKind, Thumbnail, VolumeMetadata, VolumeProcessor,
        error, pair_sources, route, types,
    };
    pub use crate::classify::classify;
    pub use crate::collaborators::{
        Decompressor, ImageThumbnailer, MemoryStore, Thumbnailer, VolumeStore, ZipDecompressor,
    };
    pub use crate::matcher::match_images;
    pub use crate::metadata::{MetadataBlock, MetadataPage, ParsedMetadata};
    pub use crate::scan::collect_entries;
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
