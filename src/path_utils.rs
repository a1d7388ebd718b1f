//! Path utilities for forward-slash, origin-independent path handling.
//!
//! Every path that enters the engine (drag-and-drop, file picker, cloud listing,
//! archive entry) is reduced to forward-slash segments with no leading `./` or `/`.
//! The helpers here work on those strings directly so that pairing never depends on
//! the host operating system's path rules.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

/// Converts a raw path into the canonical forward-slash form.
///
/// # Arguments
///
/// * `path` - The path to normalize, with either separator style
///
/// # Returns
///
/// * `String` - The path with `/` separators, no empty or `.` segments, no leading or trailing slash
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the parent directory of a normalized path, or `""` for top-level entries.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

/// Returns the last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Strips the last extension from a file name.
///
/// Dotfiles without a further extension (e.g. `.hidden`) are returned unchanged.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// Returns the lowercased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(index) => Some(name[index + 1..].to_lowercase()),
    }
}

/// Produces the comparison key used for stem and path matching.
///
/// Applies NFC normalization (macOS hands out decomposed file names) and lowercases.
pub fn normalized_key(value: &str) -> String {
    value.nfc().collect::<String>().to_lowercase()
}

/// Joins a directory and a relative path, treating `""` as the root.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `path` equals `ancestor` or lives somewhere below it.
///
/// The root (`""`) contains every path.
pub fn is_within(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// Returns `path` relative to `dir`, or the full path when it is not below `dir`.
pub fn relative_to<'a>(dir: &str, path: &'a str) -> &'a str {
    if dir.is_empty() || !is_within(dir, path) || path.len() == dir.len() {
        return path;
    }
    &path[dir.len() + 1..]
}

/// Natural ("alphanumeric") ordering: `page2` sorts before `page10`.
///
/// Ties under case-insensitive comparison are broken by byte order so that the
/// ordering stays total and deterministic.
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(a, b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("a\\b\\c.jpg"), "a/b/c.jpg");
        assert_eq!(normalize_separators("./a//b/"), "a/b");
        assert_eq!(normalize_separators("/root.mokuro"), "root.mokuro");
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_dir("series/vol01/001.jpg"), "series/vol01");
        assert_eq!(parent_dir("vol01.mokuro"), "");
        assert_eq!(file_name("series/vol01/001.jpg"), "001.jpg");
        assert_eq!(file_name("vol01.mokuro"), "vol01.mokuro");
    }

    #[test]
    fn test_file_stem_and_extension() {
        assert_eq!(file_stem("vol01.mokuro"), "vol01");
        assert_eq!(file_stem("archive.tar.cbz"), "archive.tar");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(extension("a/B.JPG"), Some("jpg".to_string()));
        assert_eq!(extension("a/noext"), None);
    }

    #[test]
    fn test_normalized_key_composes_and_lowercases() {
        // "が" written as "か" + combining dakuten
        let decomposed = "\u{304B}\u{3099}Vol";
        assert_eq!(normalized_key(decomposed), "\u{304C}vol");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("series", "series/vol01"));
        assert!(is_within("series", "series"));
        assert!(!is_within("series", "series2/vol01"));
        assert!(is_within("", "anything"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("series/vol01", "series/vol01/001.jpg"), "001.jpg");
        assert_eq!(relative_to("", "001.jpg"), "001.jpg");
        assert_eq!(relative_to("other", "series/001.jpg"), "series/001.jpg");
    }

    #[test]
    fn test_compare_natural() {
        let mut names = vec!["page10.jpg", "page2.jpg", "Page1.jpg"];
        names.sort_by(|a, b| compare_natural(a, b));
        assert_eq!(names, vec!["Page1.jpg", "page2.jpg", "page10.jpg"]);
    }
}
