//! Custom error types and result handling for Yomikomi operations.
//!
//! This module defines the error handling system used throughout the crate.
//! All fallible operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! Only conditions that are fatal for a single pairing are errors. Orphaned sidecars,
//! missing pages and failed thumbnails are reported as warnings or diagnostics instead.

/// Type alias for Results with Yomikomi errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Yomikomi operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON errors that are not tied to a specific sidecar file
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Image decoding/encoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// ZIP archive errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::importer::ImportConfigBuilderError),
    /// The sidecar file is not well-formed JSON (or has the wrong shape)
    #[error("Invalid mokuro file '{path}': {reason}")]
    InvalidMetadataJson { path: String, reason: String },
    /// The sidecar file is well-formed but lacks required fields
    #[error("Mokuro file '{path}' is missing required fields: {}", fields.join(", "))]
    MissingRequiredFields { path: String, fields: Vec<String> },
    /// The persistence layer already holds a volume with this id
    #[error("Volume '{0}' already exists")]
    DuplicateVolume(String),
    /// Thumbnail generation failed; callers treat this as non-fatal
    #[error("Thumbnail generation failed: {0}")]
    ThumbnailGeneration(String),
    /// The decompression collaborator could not unpack an archive
    #[error("Failed to decompress '{path}': {reason}")]
    Decompression { path: String, reason: String },
    /// A source produced neither pages nor nested sources
    #[error("No images found in '{0}'")]
    NoImages(String),
    /// Error for invalid file or directory paths
    #[error("The given path '{0}' is invalid: {1}")]
    InvalidPath(String, String),
    /// Error for failed asynchronous tasks
    #[error("Asynchronous task failed: {0}")]
    AsyncTaskError(String),
    /// Error for unsupported operations or formats (e.g., a RAR archive given to the zip decompressor)
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Error for resources that couldn't be found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
