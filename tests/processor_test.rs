//! Volume processor tests.
//!
//! Sources are paired with the real pairing engine and processed with the default
//! collaborators unless a test needs a failing one.

use async_trait::async_trait;
use serde_json::json;
use yomikomi::error::{Error, Result};
use yomikomi::naming::series_id_for;
use yomikomi::prelude::*;

mod common;
use common::{image_entry, mokuro_entry, mokuro_json, png_bytes, zip_bytes};

struct FailingThumbnailer;

#[async_trait]
impl Thumbnailer for FailingThumbnailer {
    async fn generate(&self, _image: &Blob) -> Result<Thumbnail> {
        Err(Error::ThumbnailGeneration("decoder exploded".to_string()))
    }
}

fn processor() -> VolumeProcessor {
    processor_with(ImportConfig::default(), Arc::new(ImageThumbnailer::default()))
}

fn processor_with(config: ImportConfig, thumbnailer: Arc<dyn Thumbnailer>) -> VolumeProcessor {
    VolumeProcessor::new(config, Arc::new(ZipDecompressor::new()), thumbnailer)
}

/// Pairs `entries` and returns the single pairing they produce.
fn single_pairing(entries: &[FileEntry]) -> PairedSource {
    let mut result = pair_sources(entries);
    assert_eq!(result.pairings.len(), 1, "expected exactly one pairing");
    result.pairings.remove(0)
}

#[tokio::test]
async fn test_cumulative_character_counts() -> Result<()> {
    let sidecar = mokuro_json(
        "Yotsuba",
        "Volume 1",
        &[("p1.jpg", &["あいう"]), ("p2.jpg", &["かきくけ"])],
    );
    let pairing = single_pairing(&[
        FileEntry::new("yotsuba.mokuro", sidecar.to_string().as_str()),
        image_entry("yotsuba/p1.jpg"),
        image_entry("yotsuba/p2.jpg"),
    ]);

    let volume = processor().process_source(&pairing).await?;

    assert_eq!(volume.metadata.page_char_counts, vec![3, 7]);
    assert_eq!(volume.metadata.total_chars, 7);
    assert_eq!(volume.metadata.page_count, 2);
    assert_eq!(volume.metadata.series_name, "Yotsuba");
    assert_eq!(volume.metadata.volume_name, "Volume 1");
    assert_eq!(volume.metadata.volume_id, "volume-Yotsuba-Volume 1");
    assert_eq!(volume.metadata.metadata_version, "0.2.1");
    assert!(!volume.metadata.is_image_only());
    assert!(volume.metadata.mismatch.is_none());
    assert!(volume.metadata.thumbnail.is_some());
    assert_eq!(volume.files.keys().collect::<Vec<_>>(), vec!["p1.jpg", "p2.jpg"]);
    assert_eq!(volume.ocr_pages[1].blocks[0].lines, vec!["かきくけ"]);
    assert!(volume.nested_sources.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sidecar_total_overrides_computed_total() -> Result<()> {
    let mut sidecar = mokuro_json("S", "V", &[("1.jpg", &["abc"])]);
    sidecar["chars"] = json!(120);
    let pairing = single_pairing(&[
        FileEntry::new("v.mokuro", sidecar.to_string().as_str()),
        image_entry("v/1.jpg"),
    ]);

    let volume = processor().process_source(&pairing).await?;

    assert_eq!(volume.metadata.total_chars, 120);
    assert_eq!(volume.metadata.page_char_counts, vec![3]);
    Ok(())
}

#[tokio::test]
async fn test_missing_pages_get_placeholders() -> Result<()> {
    let pairing = single_pairing(&[
        mokuro_entry("v.mokuro", "S", "V", &["p1.jpg", "p2.jpg", "p3.jpg"]),
        image_entry("v/p1.jpg"),
        image_entry("v/p2.jpg"),
    ]);

    let volume = processor().process_source(&pairing).await?;

    assert_eq!(volume.metadata.page_count, 3);
    assert_eq!(volume.metadata.missing_pages, vec!["p3.jpg"]);
    let mismatch = volume.metadata.mismatch.as_ref().unwrap();
    assert_eq!(mismatch.expected, 3);
    assert_eq!(mismatch.found, 2);
    assert_eq!(mismatch.missing_files, vec!["p3.jpg"]);

    let placeholder = &volume.files["p3.jpg"];
    assert!(placeholder.is_placeholder());
    assert!(!volume.files["p1.jpg"].is_placeholder());

    // Sized from the page's declared dimensions
    let decoded = image::load_from_memory(placeholder.bytes())?;
    assert_eq!((decoded.width(), decoded.height()), (16, 24));
    Ok(())
}

#[tokio::test]
async fn test_placeholder_default_size() -> Result<()> {
    let sidecar = json!({
        "version": "0.2.1",
        "title": "S",
        "title_uuid": "s",
        "volume": "V",
        "volume_uuid": "v",
        "pages": [{ "img_path": "gone.jpg", "blocks": [] }],
    });
    let config = ImportConfig::builder()
        .placeholder_width(40u32)
        .placeholder_height(60u32)
        .build()?;
    let pairing = PairedSource::new(
        Source::Directory {
            files: Default::default(),
        },
        "v",
        Some(FileEntry::new("v.mokuro", sidecar.to_string().as_str())),
        false,
    );

    let volume = processor_with(config, Arc::new(ImageThumbnailer::default()))
        .process_source(&pairing)
        .await?;

    let decoded = image::load_from_memory(volume.files["gone.jpg"].bytes())?;
    assert_eq!((decoded.width(), decoded.height()), (40, 60));
    // Only placeholders, so there is nothing to take a thumbnail of
    assert!(volume.metadata.thumbnail.is_none());
    Ok(())
}

#[tokio::test]
async fn test_missing_required_fields() {
    let mut sidecar = mokuro_json("S", "V", &[("1.jpg", &[])]);
    let object = sidecar.as_object_mut().unwrap();
    object.remove("volume_uuid");
    object.remove("pages");
    let pairing = single_pairing(&[
        FileEntry::new("v.mokuro", sidecar.to_string().as_str()),
        image_entry("v/1.jpg"),
    ]);

    let err = processor().process_source(&pairing).await.unwrap_err();

    match err {
        Error::MissingRequiredFields { path, fields } => {
            assert_eq!(path, "v.mokuro");
            assert_eq!(fields, vec!["volume_uuid", "pages"]);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_invalid_sidecar_json() {
    let pairing = single_pairing(&[
        FileEntry::new("v.mokuro", "{ \"version\": "),
        image_entry("v/1.jpg"),
    ]);

    let err = processor().process_source(&pairing).await.unwrap_err();

    assert!(matches!(err, Error::InvalidMetadataJson { ref path, .. } if path == "v.mokuro"));
}

#[tokio::test]
async fn test_image_only_volume_naming() -> Result<()> {
    let pairing = single_pairing(&[
        image_entry("Downloads/Nichijou v01/002.jpg"),
        image_entry("Downloads/Nichijou v01/001.jpg"),
        image_entry("Downloads/Nichijou v01/010.jpg"),
    ]);
    assert!(pairing.image_only);

    let volume = processor().process_source(&pairing).await?;

    assert!(volume.metadata.is_image_only());
    assert_eq!(volume.metadata.series_name, "Nichijou");
    assert_eq!(volume.metadata.volume_name, "Nichijou v01");
    assert_eq!(volume.metadata.series_id, series_id_for("nichijou"));
    assert_eq!(volume.metadata.page_char_counts, vec![0, 0, 0]);
    assert_eq!(volume.metadata.total_chars, 0);
    let pages: Vec<&str> = volume.ocr_pages.iter().map(|p| p.img_path.as_str()).collect();
    assert_eq!(pages, vec!["001.jpg", "002.jpg", "010.jpg"]);
    assert!(pages.iter().all(|page| volume.files.contains_key(*page)));
    Ok(())
}

#[tokio::test]
async fn test_image_only_ids_are_stable() -> Result<()> {
    let entries = [image_entry("Berserk/Vol. 3/1.png")];
    let first = processor().process_source(&single_pairing(&entries)).await?;
    let second = processor().process_source(&single_pairing(&entries)).await?;

    assert_eq!(first.metadata.volume_id, second.metadata.volume_id);
    assert_eq!(first.metadata.series_name, "Berserk");
    assert_eq!(first.metadata.series_id, series_id_for("BERSERK"));
    Ok(())
}

#[tokio::test]
async fn test_toc_pages_keyed_by_chapter() -> Result<()> {
    let pairing = single_pairing(&[
        mokuro_entry(
            "series/series.mokuro",
            "Series",
            "1",
            &["chapter01/p1.jpg", "chapter01/p2.jpg", "chapter02/p1.jpg"],
        ),
        image_entry("series/chapter01/p1.jpg"),
        image_entry("series/chapter01/p2.jpg"),
        image_entry("series/chapter02/p1.jpg"),
    ]);

    let volume = processor().process_source(&pairing).await?;

    assert!(volume.metadata.missing_pages.is_empty());
    assert_eq!(
        volume.files.keys().collect::<Vec<_>>(),
        vec!["chapter01/p1.jpg", "chapter01/p2.jpg", "chapter02/p1.jpg"]
    );
    Ok(())
}

#[tokio::test]
async fn test_archive_with_embedded_sidecar() -> Result<()> {
    let sidecar = mokuro_json("Series", "Vol 1", &[("001.jpg", &["abc"]), ("002.jpg", &[])]);
    let archive = zip_bytes(&[
        ("Vol 1.mokuro", sidecar.to_string().into_bytes()),
        ("Vol 1/001.jpg", png_bytes(8, 8)),
        ("Vol 1/002.jpg", png_bytes(8, 8)),
        ("__MACOSX/Vol 1/._001.jpg", vec![0; 4]),
    ]);
    let pairing = single_pairing(&[FileEntry::new("Vol 1.cbz", archive)]);
    assert!(pairing.metadata_file.is_none());

    let volume = processor().process_source(&pairing).await?;

    assert_eq!(volume.metadata.volume_name, "Vol 1");
    assert_eq!(volume.metadata.page_char_counts, vec![3, 3]);
    assert!(volume.metadata.missing_pages.is_empty());
    assert_eq!(volume.files.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_nested_archives_are_reemitted() -> Result<()> {
    let volume_one = zip_bytes(&[("001.jpg", png_bytes(8, 8)), ("002.jpg", png_bytes(8, 8))]);
    let volume_two = zip_bytes(&[("001.jpg", png_bytes(8, 8))]);
    let catalog = zip_bytes(&[
        ("Series/Series v02.cbz", volume_two),
        ("Series/Series v01.cbz", volume_one),
    ]);
    let pairing = single_pairing(&[FileEntry::new("catalog.zip", catalog)]);
    let processor = processor();

    let container = processor.process_source(&pairing).await?;

    assert!(container.is_container());
    assert_eq!(container.metadata.page_count, 0);
    let nested: Vec<&str> = container
        .nested_sources
        .iter()
        .map(|source| source.base_path.as_str())
        .collect();
    assert_eq!(nested, vec!["Series v01", "Series v02"]);
    assert!(container.nested_sources.iter().all(|s| s.metadata_file.is_none()));

    let first = processor.process_source(&container.nested_sources[0]).await?;
    assert_eq!(first.metadata.page_count, 2);
    assert_eq!(first.metadata.series_name, "Series");
    assert!(first.nested_sources.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_archive_with_several_sidecars_is_split() -> Result<()> {
    let bundle = zip_bytes(&[
        ("v1.mokuro", mokuro_json("S", "v1", &[("1.jpg", &[])]).to_string().into_bytes()),
        ("v1/1.jpg", png_bytes(8, 8)),
        ("v2.mokuro", mokuro_json("S", "v2", &[("1.jpg", &[])]).to_string().into_bytes()),
        ("v2/1.jpg", png_bytes(8, 8)),
    ]);
    let pairing = single_pairing(&[FileEntry::new("bundle.zip", bundle)]);

    let container = processor().process_source(&pairing).await?;

    assert!(container.is_container());
    let mut nested: Vec<&str> = container
        .nested_sources
        .iter()
        .map(|source| source.base_path.as_str())
        .collect();
    nested.sort();
    assert_eq!(nested, vec!["bundle/v1", "bundle/v2"]);
    assert!(container.nested_sources.iter().all(|s| s.metadata_file.is_some()));
    Ok(())
}

#[tokio::test]
async fn test_embedded_sidecar_does_not_swallow_other_folders() -> Result<()> {
    let bundle = zip_bytes(&[
        ("v1.mokuro", mokuro_json("S", "v1", &[("1.jpg", &[])]).to_string().into_bytes()),
        ("v1/1.jpg", png_bytes(8, 8)),
        ("v2/1.jpg", png_bytes(8, 8)),
        ("v2/2.jpg", png_bytes(8, 8)),
    ]);
    let pairing = single_pairing(&[FileEntry::new("bundle.zip", bundle)]);

    let container = processor().process_source(&pairing).await?;

    assert!(container.is_container());
    let mut nested: Vec<(&str, bool)> = container
        .nested_sources
        .iter()
        .map(|source| (source.base_path.as_str(), source.image_only))
        .collect();
    nested.sort();
    assert_eq!(nested, vec![("bundle/v1", false), ("bundle/v2", true)]);
    Ok(())
}

#[tokio::test]
async fn test_unreferenced_images_are_recorded() -> Result<()> {
    let pairing = single_pairing(&[
        mokuro_entry("v.mokuro", "S", "V", &["1.jpg"]),
        image_entry("v/1.jpg"),
        image_entry("v/2.jpg"),
    ]);

    let volume = processor().process_source(&pairing).await?;

    assert!(volume.metadata.missing_pages.is_empty());
    let mismatch = volume.metadata.mismatch.as_ref().unwrap();
    assert_eq!(mismatch.expected, 1);
    assert_eq!(mismatch.found, 2);
    assert!(mismatch.missing_files.is_empty());
    assert_eq!(mismatch.extra_files, vec!["2.jpg"]);
    assert_eq!(volume.files.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_archive_without_images() {
    let archive = zip_bytes(&[("readme.txt", b"hello".to_vec())]);
    let pairing = single_pairing(&[FileEntry::new("empty.cbz", archive)]);

    let err = processor().process_source(&pairing).await.unwrap_err();

    assert!(matches!(err, Error::NoImages(ref base) if base == "empty"));
}

#[tokio::test]
async fn test_unsupported_archive_format() {
    let pairing = single_pairing(&[FileEntry::new("volume.rar", b"Rar!")]);

    let err = processor().process_source(&pairing).await.unwrap_err();

    assert!(matches!(err, Error::Unsupported(_)));
}

#[tokio::test]
async fn test_thumbnail_failure_is_not_fatal() -> Result<()> {
    let pairing = single_pairing(&[
        mokuro_entry("v.mokuro", "S", "V", &["1.jpg"]),
        image_entry("v/1.jpg"),
    ]);

    let volume = processor_with(ImportConfig::default(), Arc::new(FailingThumbnailer))
        .process_source(&pairing)
        .await?;

    assert!(volume.metadata.thumbnail.is_none());
    assert_eq!(volume.metadata.page_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_thumbnails_can_be_disabled() -> Result<()> {
    let config = ImportConfig::builder().generate_thumbnails(false).build()?;
    let pairing = single_pairing(&[image_entry("v/1.jpg")]);

    let volume = processor_with(config, Arc::new(ImageThumbnailer::default()))
        .process_source(&pairing)
        .await?;

    assert!(volume.metadata.thumbnail.is_none());
    Ok(())
}
