//! External collaborators of the import pipeline.
//!
//! The pairing engine and volume processor never touch archive formats, pixels or
//! storage themselves. They talk to these traits, and the host plugs in whatever
//! fits its platform. Default implementations are provided for zip archives, the
//! `image` crate and an in-memory store.

use crate::error::Result;
use crate::types::{Blob, FileEntry, ProcessedVolume, Thumbnail};
use async_trait::async_trait;

pub mod archive;
pub mod store;
pub mod thumbnail;

pub use archive::ZipDecompressor;
pub use store::MemoryStore;
pub use thumbnail::ImageThumbnailer;

/// Unpacks an archive into its member files.
#[async_trait]
pub trait Decompressor: Send + Sync {
    /// Decompresses a whole archive in one batch.
    ///
    /// # Parameters
    /// * `archive` - The archive entry; its path is only used for diagnostics
    ///
    /// # Returns
    /// * `Result<Vec<FileEntry>>` - Member files with paths relative to the archive root
    async fn decompress(&self, archive: &FileEntry) -> Result<Vec<FileEntry>>;
}

/// Produces cover thumbnails.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    /// Generates a thumbnail for an encoded image.
    ///
    /// Failures are non-fatal to callers; they log and continue without a thumbnail.
    async fn generate(&self, image: &Blob) -> Result<Thumbnail>;
}

/// Persistence contract for processed volumes.
///
/// A volume consists of three logical records (metadata, OCR pages, page files)
/// which implementations must write as one unit.
#[async_trait]
pub trait VolumeStore: Send + Sync {
    async fn exists(&self, volume_id: &str) -> Result<bool>;

    /// Persists a volume.
    ///
    /// # Returns
    /// * `Ok(())` - All three records were written
    /// * `Err(Error::DuplicateVolume)` - A volume with the same id already exists; nothing was written
    async fn save(&self, volume: ProcessedVolume) -> Result<()>;

    async fn delete(&self, volume_id: &str) -> Result<()>;
}
