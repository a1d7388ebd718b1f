//! Series/volume naming for image-only volumes and deterministic identifiers.
//!
//! Without a sidecar, the only naming evidence is the folder or archive name. This
//! module strips release noise from those names, recognizes the common volume markers
//! (`第3巻`, `Vol. 3`, `v03`, `#3`, `- 03`, ...) and decides whether the parent folder
//! or the leaf supplies the series name.
//!
//! Identifiers are UUID v5 values in one crate-wide namespace, so the same normalized
//! series name always maps to the same series id.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use uuid::Uuid;

use crate::path_utils::normalized_key;

/// Namespace for every identifier this crate derives from strings.
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d6f_6b75_726f_4e00_8000_796f_6d69_6b6f);

/// Fallback name when a path offers nothing usable.
pub const UNTITLED: &str = "Untitled";

/// Parent-folder names too generic to be a series name.
pub const DEFAULT_GENERIC_FOLDERS: &[&str] = &[
    "downloads",
    "download",
    "manga",
    "mangas",
    "comics",
    "comic",
    "books",
    "library",
    "raw",
    "raws",
    "scans",
    "scan",
    "import",
    "imports",
    "desktop",
    "documents",
    "new folder",
    "untitled folder",
    "volumes",
    "archives",
    "cbz",
    "tmp",
    "temp",
    "ja",
    "jp",
    "jpn",
    "japanese",
    "en",
    "eng",
    "english",
    "zh",
    "cn",
    "chinese",
    "ko",
    "kr",
    "korean",
    "漫画",
    "マンガ",
];

/// Owned copy of [`DEFAULT_GENERIC_FOLDERS`], for configuration defaults.
pub fn default_generic_folders() -> Vec<String> {
    DEFAULT_GENERIC_FOLDERS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

lazy_static! {
    /// Bracketed tags: `[Group]`, `(2019)`, `{HQ}`, `【作者】`, full-width parentheses.
    static ref BRACKETED: Regex =
        Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}|【[^】]*】|（[^）]*）|［[^］]*］").unwrap();
    /// Bracket content that is itself a volume marker and must survive noise stripping.
    static ref BRACKETED_VOLUME: Regex =
        Regex::new(r"(?i)^\s*(?:(?:volume|vol\.?|v\.?)\s*\d+(?:\.\d+)?|第?\s*\d+\s*巻|\d{1,3})\s*$").unwrap();
    /// Quote characters wrapped around titles.
    static ref QUOTES: Regex = Regex::new(r#"[「」『』“”"]"#).unwrap();
    /// Trailing scan-quality and source markers.
    static ref QUALITY_SUFFIX: Regex =
        Regex::new(r"(?i)[\s_\-]+(?:digital|hq|lq|hd|raw|raws|scan|scans|scanned|c2c)\s*$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Volume patterns in priority order.
    ///
    /// Markers must follow a separator (or start the name) so that words such as
    /// "Dev" or "Touch" are not read as `v`/`ch` markers.
    static ref VOLUME_PATTERNS: Vec<Regex> = vec![
        // 第3巻
        Regex::new(r"^(?P<series>.*?)\s*第\s*(?P<num>\d+)\s*巻").unwrap(),
        // 3巻
        Regex::new(r"^(?P<series>.*?)\s*(?P<num>\d+)\s*巻").unwrap(),
        // Vol. 3 / Volume 3 / V. 3
        Regex::new(r"(?i)^(?P<series>.*?)(?:^|[\s_\-.,]+)(?:volume|vol\.?|v\.)\s*(?P<num>\d+(?:\.\d+)?)").unwrap(),
        // v03
        Regex::new(r"(?i)^(?P<series>.*?)(?:^|[\s_\-.,]+)v(?P<num>\d+)(?:$|[^0-9a-z])").unwrap(),
        // Ch. 3 / Chapter 3
        Regex::new(r"(?i)^(?P<series>.*?)(?:^|[\s_\-.,]+)(?:chapter|ch\.?)\s*(?P<num>\d+(?:\.\d+)?)").unwrap(),
        // Ver. 3
        Regex::new(r"(?i)^(?P<series>.*?)(?:^|[\s_\-.,]+)ver\.?\s*(?P<num>\d+(?:\.\d+)?)").unwrap(),
        // #3
        Regex::new(r"^(?P<series>.*?)\s*#\s*(?P<num>\d+)").unwrap(),
        // Title - 03 / Title_03
        Regex::new(r"^(?P<series>.*?)\s*[-_]\s*(?P<num>\d+)\s*$").unwrap(),
        // Title 03
        Regex::new(r"^(?P<series>.*?)\s+(?P<num>\d+)\s*$").unwrap(),
        // Title03
        Regex::new(r"^(?P<series>.*?\D)(?P<num>\d+)$").unwrap(),
    ];
}

/// Names derived for an image-only volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedNames {
    pub series_name: String,
    pub volume_name: String,
    /// The volume number found in the leaf name, as written (e.g. `"03"`).
    pub volume_number: Option<String>,
}

/// Derives series and volume names from a base path.
///
/// # Arguments
///
/// * `base_path` - Forward-slash path of the folder or archive (without extension)
/// * `generic_folders` - Parent-folder names that must never become the series name
///
/// # Returns
///
/// * `DerivedNames` - The parent folder names the series unless it is generic; otherwise
///   the part of the leaf before the volume marker; otherwise the cleaned leaf itself
pub fn derive_names(base_path: &str, generic_folders: &[String]) -> DerivedNames {
    let segments: Vec<&str> = base_path.split('/').filter(|s| !s.is_empty()).collect();
    let leaf = segments.last().copied().unwrap_or("");

    let cleaned_leaf = clean_name(leaf);
    let volume_name = if !cleaned_leaf.is_empty() {
        cleaned_leaf.clone()
    } else if !leaf.trim().is_empty() {
        leaf.trim().to_string()
    } else {
        UNTITLED.to_string()
    };

    let (leaf_series, volume_number) = match match_volume_pattern(&cleaned_leaf) {
        Some((series, number)) => (Some(series).filter(|s| !s.is_empty()), Some(number)),
        None => (None, None),
    };

    let parent_series = segments
        .len()
        .checked_sub(2)
        .map(|index| clean_name(segments[index]))
        .filter(|parent| !parent.is_empty() && !is_generic_folder(parent, generic_folders));

    let series_name = parent_series
        .or(leaf_series)
        .unwrap_or_else(|| volume_name.clone());

    DerivedNames {
        series_name,
        volume_name,
        volume_number,
    }
}

/// Removes release-group/year/bracket tags, quotes and quality suffixes.
pub fn clean_name(raw: &str) -> String {
    let unwrapped = BRACKETED.replace_all(raw, |caps: &Captures| {
        let tag = &caps[0];
        let inner = &tag[tag.char_indices().nth(1).map_or(0, |(i, _)| i)
            ..tag.char_indices().last().map_or(tag.len(), |(i, _)| i)];
        if BRACKETED_VOLUME.is_match(inner) {
            format!(" {} ", inner.trim())
        } else {
            " ".to_string()
        }
    });
    let unquoted = QUOTES.replace_all(&unwrapped, " ");

    let mut name = WHITESPACE.replace_all(unquoted.trim(), " ").to_string();
    loop {
        let stripped = QUALITY_SUFFIX.replace(&name, "").to_string();
        if stripped == name {
            break;
        }
        name = stripped;
    }
    trim_separators(&name).to_string()
}

/// Applies the volume patterns in priority order.
///
/// Returns the tidied series prefix and the volume number of the first match.
fn match_volume_pattern(name: &str) -> Option<(String, String)> {
    VOLUME_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(name)?;
        let series = caps.name("series").map_or("", |m| m.as_str());
        let number = caps.name("num")?.as_str().to_string();
        Some((tidy_series(series), number))
    })
}

fn tidy_series(series: &str) -> String {
    let spaced = series.replace('_', " ");
    let collapsed = WHITESPACE.replace_all(spaced.trim(), " ");
    trim_separators(&collapsed).to_string()
}

fn trim_separators(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.' | ',' | '~'))
}

fn is_generic_folder(name: &str, generic_folders: &[String]) -> bool {
    let key = normalized_key(name);
    generic_folders
        .iter()
        .any(|generic| normalized_key(generic) == key)
}

/// Normalizes a name for hashing: NFC, lowercase, collapsed whitespace.
pub fn normalize_for_id(name: &str) -> String {
    normalized_key(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The single identifier derivation used across the crate.
///
/// Parts are joined with a unit separator so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn stable_id(parts: &[&str]) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, parts.join("\u{1f}").as_bytes())
}

/// Series identifier for a (possibly image-only) series name.
pub fn series_id_for(series_name: &str) -> String {
    stable_id(&["series", normalize_for_id(series_name).as_str()]).to_string()
}

/// Volume identifier for an image-only volume of a series.
pub fn image_only_volume_id(series_id: &str, volume_name: &str) -> String {
    stable_id(&["volume", series_id, normalize_for_id(volume_name).as_str()]).to_string()
}
