//! Mokuro sidecar parsing.
//!
//! A sidecar is a JSON object produced by the mokuro OCR tool. The required keys are
//! checked on the raw JSON first so that an incomplete file reports *which* fields are
//! missing instead of a generic deserialization error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Top-level keys every sidecar must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "version",
    "title",
    "title_uuid",
    "volume",
    "volume_uuid",
    "pages",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A parsed sidecar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(rename = "title", deserialize_with = "lenient_string")]
    pub series_name: String,
    #[serde(rename = "title_uuid", deserialize_with = "lenient_string")]
    pub series_id: String,
    #[serde(rename = "volume", deserialize_with = "lenient_string")]
    pub volume_name: String,
    #[serde(rename = "volume_uuid", deserialize_with = "lenient_string")]
    pub volume_id: String,
    pub pages: Vec<MetadataPage>,
    #[serde(rename = "chars", default)]
    pub total_chars: Option<u64>,
}

/// One declared page and its OCR blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataPage {
    pub img_path: String,
    #[serde(default)]
    pub img_width: Option<u32>,
    #[serde(default)]
    pub img_height: Option<u32>,
    #[serde(default)]
    pub blocks: Vec<MetadataBlock>,
}

/// A text block detected on a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBlock {
    #[serde(rename = "box", default)]
    pub bounding_box: Option<[f64; 4]>,
    #[serde(default)]
    pub vertical: bool,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub lines_coords: Option<Vec<Vec<[f64; 2]>>>,
}

impl MetadataBlock {
    /// Characters across all lines, counted in UTF-16 code units.
    ///
    /// Readers that consume these counts measure text the same way, so a character
    /// outside the Basic Multilingual Plane (e.g. `𠮟`) counts as two.
    pub fn char_count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| line.encode_utf16().count() as u64)
            .sum()
    }
}

impl MetadataPage {
    /// Creates a page without OCR content, as used for image-only volumes.
    pub fn image_only(img_path: impl Into<String>) -> Self {
        Self {
            img_path: img_path.into(),
            img_width: None,
            img_height: None,
            blocks: Vec::new(),
        }
    }

    pub fn char_count(&self) -> u64 {
        self.blocks.iter().map(MetadataBlock::char_count).sum()
    }
}

impl ParsedMetadata {
    /// Parses and validates a sidecar.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the sidecar, used in error messages
    /// * `bytes` - Raw file content (a leading UTF-8 BOM is tolerated)
    ///
    /// # Returns
    ///
    /// * `Ok(ParsedMetadata)` - The parsed sidecar
    /// * `Err(Error::InvalidMetadataJson)` - Not JSON, not an object, or fields of the wrong type
    /// * `Err(Error::MissingRequiredFields)` - Well-formed, but required keys are absent or null
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let invalid = |reason: String| Error::InvalidMetadataJson {
            path: path.to_string(),
            reason,
        };

        let value: Value = serde_json::from_slice(bytes).map_err(|e| invalid(e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(invalid("top-level value is not an object".to_string()));
        };

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| object.get(**field).is_none_or(Value::is_null))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingRequiredFields {
                path: path.to_string(),
                fields: missing,
            });
        }

        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }

    /// Running character totals, one entry per declared page.
    pub fn cumulative_char_counts(&self) -> Vec<u64> {
        cumulative_char_counts(&self.pages)
    }

    /// The sidecar's own total when present and non-zero, otherwise the computed one.
    pub fn effective_total_chars(&self) -> u64 {
        match self.total_chars {
            Some(total) if total > 0 => total,
            _ => self.pages.iter().map(MetadataPage::char_count).sum(),
        }
    }
}

/// Running sum of per-page character counts.
pub fn cumulative_char_counts(pages: &[MetadataPage]) -> Vec<u64> {
    pages
        .iter()
        .scan(0u64, |total, page| {
            *total += page.char_count();
            Some(*total)
        })
        .collect()
}

/// Accepts either a JSON string or a number (some tools write `"version": 0.2`).
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}
