//! Common test utilities for the Yomikomi crate.
//!
//! Provides in-memory fixtures (encoded images, zip archives, mokuro sidecars) and
//! helpers for setting up scratch directories on disk.

use image::{ImageFormat, Rgb, RgbImage};
use rand::{Rng, distributions::Alphanumeric};
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tokio::fs;
use yomikomi::prelude::*;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";

/// Encodes a small solid-color PNG.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}

/// A file entry holding a real 16x24 PNG, whatever the extension says.
#[allow(dead_code)]
pub fn image_entry(path: &str) -> FileEntry {
    FileEntry::new(path, png_bytes(16, 24))
}

/// A file entry with dummy bytes, for tests that never decode the content.
#[allow(dead_code)]
pub fn stub_entry(path: &str) -> FileEntry {
    FileEntry::new(path, b"stub")
}

/// Builds a zip archive from `(name, bytes)` pairs.
#[allow(dead_code)]
pub fn zip_bytes(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Builds a sidecar with one OCR block per page.
///
/// Each page is `(img_path, lines)`.
#[allow(dead_code)]
pub fn mokuro_json(title: &str, volume: &str, pages: &[(&str, &[&str])]) -> Value {
    let pages: Vec<Value> = pages
        .iter()
        .map(|(img_path, lines)| {
            json!({
                "img_path": img_path,
                "img_width": 16,
                "img_height": 24,
                "blocks": [{
                    "box": [0, 0, 10, 10],
                    "vertical": true,
                    "font_size": 12.0,
                    "lines": lines,
                    "lines_coords": [],
                }],
            })
        })
        .collect();

    json!({
        "version": "0.2.1",
        "title": title,
        "title_uuid": format!("series-{}", title),
        "volume": volume,
        "volume_uuid": format!("volume-{}-{}", title, volume),
        "pages": pages,
    })
}

/// Sidecar entry for pages without text.
#[allow(dead_code)]
pub fn mokuro_entry(path: &str, title: &str, volume: &str, pages: &[&str]) -> FileEntry {
    let pages: Vec<(&str, &[&str])> = pages.iter().map(|p| (*p, &[][..])).collect();
    FileEntry::new(path, mokuro_json(title, volume, &pages).to_string().as_str())
}

/// Base paths of a pairing result, sorted.
#[allow(dead_code)]
pub fn base_paths(result: &PairingResult) -> Vec<String> {
    let mut paths: Vec<String> = result
        .pairings
        .iter()
        .map(|p| p.base_path.clone())
        .collect();
    paths.sort();
    paths
}

/// Creates a unique, empty scratch directory below [`TEST_TMP_DIR`].
#[allow(dead_code)]
pub async fn setup_test_dir(sub_path: &str) -> PathBuf {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let test_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if test_dir.exists() {
        fs::remove_dir_all(&test_dir).await.unwrap();
    }
    fs::create_dir_all(&test_dir).await.unwrap();
    test_dir
}
