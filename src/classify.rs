//! File classification.
//!
//! Decides, from the path alone, whether an entry is a mokuro sidecar, a page image,
//! an archive, or something to ignore (OS/cloud/VCS clutter, backups, unknown files).

use crate::path_utils::{extension, file_name};
use crate::types::FileKind;

/// Extension of mokuro sidecar files.
pub const METADATA_EXTENSION: &str = "mokuro";

/// Image extensions accepted as pages.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "avif", "tif", "tiff", "jxl",
];

/// Archive extensions treated as volume containers.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz", "rar", "cbr", "7z", "cb7"];

/// Path segments (lowercased) that make the whole path ignorable.
const IGNORED_SEGMENTS: &[&str] = &[
    "__macosx",
    ".ds_store",
    ".spotlight-v100",
    ".fseventsd",
    "thumbs.db",
    "desktop.ini",
    "$recycle.bin",
    "system volume information",
    ".thumbnails",
    ".directory",
    ".git",
    ".svn",
];

/// Segment prefixes (lowercased) that make the whole path ignorable.
const IGNORED_PREFIXES: &[&str] = &["._", ".trash", ".dropbox"];

/// File-name suffixes of editor backups and temporary files.
const IGNORED_SUFFIXES: &[&str] = &["~", ".bak", ".tmp", ".temp"];

/// Classifies a normalized, forward-slash path.
///
/// # Arguments
///
/// * `path` - Path of the entry, relative to whatever root the host supplied
///
/// # Returns
///
/// * `FileKind` - `Ignorable` for deny-listed paths and unknown extensions
pub fn classify(path: &str) -> FileKind {
    if is_ignorable(path) {
        return FileKind::Ignorable;
    }

    match extension(path).as_deref() {
        Some(METADATA_EXTENSION) => FileKind::Metadata,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => FileKind::Image,
        Some(ext) if ARCHIVE_EXTENSIONS.contains(&ext) => FileKind::Archive,
        _ => FileKind::Ignorable,
    }
}

/// Whether any segment of the path is OS, cloud or VCS clutter, or a backup/temp file.
pub fn is_ignorable(path: &str) -> bool {
    let ignored_segment = path.split('/').any(|segment| {
        let segment = segment.to_lowercase();
        IGNORED_SEGMENTS.contains(&segment.as_str())
            || IGNORED_PREFIXES
                .iter()
                .any(|prefix| segment.starts_with(prefix))
    });
    if ignored_segment {
        return true;
    }

    let name = file_name(path).to_lowercase();
    IGNORED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("vol01.mokuro"), FileKind::Metadata);
        assert_eq!(classify("vol01/001.JPG"), FileKind::Image);
        assert_eq!(classify("vol01/001.webp"), FileKind::Image);
        assert_eq!(classify("series/vol01.CBZ"), FileKind::Archive);
        assert_eq!(classify("series/readme.txt"), FileKind::Ignorable);
        assert_eq!(classify("series/noext"), FileKind::Ignorable);
    }

    #[test]
    fn test_deny_list_applies_at_any_depth() {
        assert_eq!(classify("__MACOSX/vol01/001.jpg"), FileKind::Ignorable);
        assert_eq!(classify("series/vol01/._001.jpg"), FileKind::Ignorable);
        assert_eq!(classify("series/.git/objects/pack.zip"), FileKind::Ignorable);
        assert_eq!(classify("a/b/c/Thumbs.db"), FileKind::Ignorable);
        assert_eq!(classify("$RECYCLE.BIN/vol.cbz"), FileKind::Ignorable);
        assert_eq!(classify(".Trashes/vol01/001.png"), FileKind::Ignorable);
        assert_eq!(classify(".dropbox.cache/x.png"), FileKind::Ignorable);

        for segment in [
            ".Spotlight-V100",
            ".fseventsd",
            "desktop.ini",
            "System Volume Information",
            ".thumbnails",
            ".directory",
            ".svn",
            ".DS_Store",
        ] {
            let nested = format!("series/vol01/{}/001.jpg", segment);
            assert_eq!(classify(&nested), FileKind::Ignorable, "{}", nested);
            let leaf = format!("series/vol01/{}", segment);
            assert_eq!(classify(&leaf), FileKind::Ignorable, "{}", leaf);
        }
    }

    #[test]
    fn test_suffix_rules() {
        assert_eq!(classify("vol01.mokuro~"), FileKind::Ignorable);
        assert_eq!(classify("vol01.mokuro.bak"), FileKind::Ignorable);
        assert_eq!(classify("vol01/001.jpg.tmp"), FileKind::Ignorable);
        assert_eq!(classify("vol01/001.jpg.temp"), FileKind::Ignorable);
    }

    #[test]
    fn test_similar_names_are_not_ignored() {
        assert_eq!(classify("gitbook/001.jpg"), FileKind::Image);
        assert_eq!(classify("series/desktop/001.jpg"), FileKind::Image);
    }
}
