//! The volume processor.
//!
//! Turns one [`PairedSource`] plus its materialized bytes into a [`ProcessedVolume`]:
//! names and ids (from the sidecar, or derived from the path for image-only volumes),
//! cumulative character counts, page files keyed the way the OCR data refers to them,
//! placeholder images for pages whose file could not be found, a thumbnail, and any
//! sources discovered inside this one.
//!
//! The processor holds no mutable state, so any number of sources can be processed
//! concurrently with one instance.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use image::{ImageFormat, Rgb, RgbImage};
use log::{debug, warn};
use rayon::prelude::*;
use tokio::task::spawn_blocking;

use crate::classify::classify;
use crate::collaborators::{Decompressor, Thumbnailer};
use crate::error::{Error, Result};
use crate::importer::ImportConfig;
use crate::matcher::match_images;
use crate::metadata::{MetadataPage, ParsedMetadata, cumulative_char_counts};
use crate::naming::{derive_names, image_only_volume_id, series_id_for, stable_id};
use crate::pairing::pair_sources;
use crate::path_utils::{
    compare_natural, file_name, file_stem, is_within, join, normalized_key, parent_dir,
};
use crate::types::{
    Blob, FileEntry, FileKind, ImageMismatch, PairedSource, ProcessedVolume, Source, Thumbnail,
    VolumeMetadata,
};

/// Largest placeholder edge, whatever a sidecar declares.
pub const MAX_PLACEHOLDER_DIMENSION: u32 = 4096;

const PLACEHOLDER_FILL: Rgb<u8> = Rgb([224, 224, 224]);
const PLACEHOLDER_INK: Rgb<u8> = Rgb([128, 128, 128]);
const PLACEHOLDER_BORDER: u32 = 4;

/// All bytes of one source, classified.
#[derive(Debug, Clone, Default)]
pub struct MaterializedContent {
    /// Image files keyed by their path inside the source.
    pub images: BTreeMap<String, Blob>,
    /// Sidecars found inside the source (only archives carry these).
    pub embedded_metadata: Vec<FileEntry>,
    /// Archives found inside the source, in natural order.
    pub archives: Vec<FileEntry>,
}

/// Processes paired sources into persistable volumes.
pub struct VolumeProcessor {
    config: ImportConfig,
    decompressor: Arc<dyn Decompressor>,
    thumbnailer: Arc<dyn Thumbnailer>,
}

impl VolumeProcessor {
    pub fn new(
        config: ImportConfig,
        decompressor: Arc<dyn Decompressor>,
        thumbnailer: Arc<dyn Thumbnailer>,
    ) -> Self {
        Self {
            config,
            decompressor,
            thumbnailer,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Materializes and processes a paired source in one step.
    pub async fn process_source(&self, paired: &PairedSource) -> Result<ProcessedVolume> {
        let content = self.materialize(paired).await?;
        self.process(paired, content).await
    }

    /// Collects the bytes of a source, decompressing archives as a single batch.
    ///
    /// # Returns
    ///
    /// * `Ok(MaterializedContent)` - Images keyed by path inside the source; TOC pages are
    ///   keyed `chapter/file`
    /// * `Err(Error)` - The decompression collaborator failed
    pub async fn materialize(&self, paired: &PairedSource) -> Result<MaterializedContent> {
        let mut content = MaterializedContent::default();
        match &paired.source {
            Source::Directory { files } => {
                content.images = files.clone();
            }
            Source::TocDirectory { chapters } => {
                for (chapter, files) in chapters {
                    for (path, blob) in files {
                        content.images.insert(join(chapter, path), blob.clone());
                    }
                }
            }
            Source::Archive { archive_file } => {
                let entries = self.decompressor.decompress(archive_file).await?;
                debug!(
                    "Decompressed '{}' into {} file(s)",
                    archive_file.path,
                    entries.len()
                );
                for entry in entries {
                    match classify(&entry.path) {
                        FileKind::Image => {
                            content.images.entry(entry.path).or_insert(entry.content);
                        }
                        FileKind::Metadata => content.embedded_metadata.push(entry),
                        FileKind::Archive => content.archives.push(entry),
                        FileKind::Ignorable => {}
                    }
                }
                content
                    .embedded_metadata
                    .sort_by(|a, b| compare_natural(&a.path, &b.path));
                content
                    .archives
                    .sort_by(|a, b| compare_natural(&a.path, &b.path));
            }
        }
        Ok(content)
    }

    /// Builds the volume record for a paired source.
    ///
    /// # Arguments
    ///
    /// * `paired` - The pairing to process
    /// * `content` - Its materialized bytes, see [`VolumeProcessor::materialize`]
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessedVolume)` - The volume; a pure container (an archive of archives)
    ///   has no pages and carries its contents in `nested_sources`
    /// * `Err(Error::InvalidMetadataJson | Error::MissingRequiredFields)` - The sidecar is unusable
    /// * `Err(Error::NoImages)` - Neither a sidecar, images nor nested sources were found
    pub async fn process(
        &self,
        paired: &PairedSource,
        content: MaterializedContent,
    ) -> Result<ProcessedVolume> {
        let MaterializedContent {
            mut images,
            embedded_metadata,
            archives,
        } = content;

        let (metadata_file, nested_sources) = match &paired.metadata_file {
            Some(file) => (Some(file.clone()), self.nest_archives(paired, archives)),
            None if embedded_metadata.len() == 1
                && archives.is_empty()
                && owns_all_images(&embedded_metadata[0], &images) =>
            {
                debug!("Using embedded sidecar of '{}'", paired.base_path);
                (embedded_metadata.into_iter().next(), Vec::new())
            }
            None if !embedded_metadata.is_empty() => (
                None,
                self.pair_embedded(
                    paired,
                    std::mem::take(&mut images),
                    embedded_metadata,
                    archives,
                ),
            ),
            None => (None, self.nest_archives(paired, archives)),
        };

        let mut volume = match metadata_file {
            Some(file) => self.process_with_metadata(&file, images).await?,
            None if images.is_empty() && nested_sources.is_empty() => {
                return Err(Error::NoImages(paired.base_path.clone()));
            }
            None if images.is_empty() => self.container_volume(paired),
            None => self.process_image_only(paired, images),
        };
        volume.nested_sources = nested_sources;

        if self.config.generate_thumbnails {
            volume.metadata.thumbnail = self.thumbnail_for(&volume).await;
        }
        Ok(volume)
    }

    /// Re-emits archives found inside a source as standalone pairings.
    fn nest_archives(&self, parent: &PairedSource, archives: Vec<FileEntry>) -> Vec<PairedSource> {
        let parent_id = parent.id.to_string();
        archives
            .into_iter()
            .map(|archive| {
                let id = stable_id(&["nested", parent_id.as_str(), archive.path.as_str()]);
                let base_path = file_stem(archive.file_name()).to_string();
                debug!(
                    "Found nested archive '{}' in '{}'",
                    archive.path, parent.base_path
                );
                PairedSource::with_id(
                    id,
                    Source::Archive {
                        archive_file: archive,
                    },
                    base_path,
                    None,
                    false,
                )
            })
            .collect()
    }

    /// Runs the pairing engine over the contents of an archive holding several volumes.
    ///
    /// Paths are scoped under the archive's name so the resulting base paths stay readable.
    /// The images are handed over to the resulting pairings, leaving the parent a container.
    fn pair_embedded(
        &self,
        parent: &PairedSource,
        images: BTreeMap<String, Blob>,
        embedded_metadata: Vec<FileEntry>,
        archives: Vec<FileEntry>,
    ) -> Vec<PairedSource> {
        let scope = file_name(&parent.base_path);
        let entries: Vec<FileEntry> = images
            .into_iter()
            .map(|(path, blob)| FileEntry::new(join(scope, &path), blob))
            .chain(
                embedded_metadata
                    .into_iter()
                    .chain(archives)
                    .map(|entry| FileEntry::new(join(scope, &entry.path), entry.content)),
            )
            .collect();

        let result = pair_sources(&entries);
        for warning in &result.warnings {
            warn!("In '{}': {}", parent.base_path, warning);
        }

        let parent_id = parent.id.to_string();
        result
            .pairings
            .into_iter()
            .map(|pairing| PairedSource {
                id: stable_id(&["nested", parent_id.as_str(), pairing.id.to_string().as_str()]),
                ..pairing
            })
            .collect()
    }

    async fn process_with_metadata(
        &self,
        file: &FileEntry,
        images: BTreeMap<String, Blob>,
    ) -> Result<ProcessedVolume> {
        let parsed = ParsedMetadata::parse(&file.path, file.content.bytes())?;
        let declared: Vec<&str> = parsed.pages.iter().map(|p| p.img_path.as_str()).collect();
        let matches = match_images(&declared, &images);

        let mut files = BTreeMap::new();
        let mut unresolved: Vec<&MetadataPage> = Vec::new();
        for page in &parsed.pages {
            match matches
                .resolve(&page.img_path)
                .and_then(|actual| images.get(actual))
            {
                Some(blob) => {
                    files.insert(page.img_path.clone(), blob.clone());
                }
                None => unresolved.push(page),
            }
        }

        if !matches.missing.is_empty() {
            warn!(
                "'{}': {} of {} page(s) have no image, using placeholders",
                file.path,
                matches.missing.len(),
                parsed.pages.len()
            );
        }
        if !matches.extra.is_empty() {
            warn!(
                "'{}': {} image(s) are not referenced by any page",
                file.path,
                matches.extra.len()
            );
        }
        let mismatch = if matches.missing.is_empty() && matches.extra.is_empty() {
            None
        } else {
            Some(ImageMismatch {
                expected: parsed.pages.len(),
                found: images.len(),
                missing_files: matches.missing.clone(),
                extra_files: matches.extra.clone(),
            })
        };

        if !unresolved.is_empty() {
            let dimensions: Vec<(u32, u32)> = unresolved
                .iter()
                .map(|page| self.placeholder_dimensions(page))
                .collect();
            let rendered = render_placeholders(dimensions.iter().copied().collect()).await?;
            for (page, dims) in unresolved.iter().zip(&dimensions) {
                if let Some(blob) = rendered.get(dims) {
                    files.insert(page.img_path.clone(), blob.clone());
                }
            }
        }

        let metadata = VolumeMetadata {
            volume_id: parsed.volume_id.clone(),
            series_id: parsed.series_id.clone(),
            series_name: parsed.series_name.clone(),
            volume_name: parsed.volume_name.clone(),
            metadata_version: parsed.version.clone(),
            page_count: parsed.pages.len(),
            total_chars: parsed.effective_total_chars(),
            page_char_counts: parsed.cumulative_char_counts(),
            thumbnail: None,
            missing_pages: matches.missing,
            mismatch,
            added_on: Utc::now(),
        };

        Ok(ProcessedVolume {
            metadata,
            ocr_pages: parsed.pages,
            files,
            nested_sources: Vec::new(),
        })
    }

    fn process_image_only(
        &self,
        paired: &PairedSource,
        images: BTreeMap<String, Blob>,
    ) -> ProcessedVolume {
        let mut paths: Vec<&String> = images.keys().collect();
        paths.sort_by(|a, b| compare_natural(a, b));
        let ocr_pages: Vec<MetadataPage> = paths
            .into_iter()
            .map(|path| MetadataPage::image_only(path.as_str()))
            .collect();

        let mut volume = self.container_volume(paired);
        volume.metadata.page_count = ocr_pages.len();
        volume.metadata.page_char_counts = cumulative_char_counts(&ocr_pages);
        volume.ocr_pages = ocr_pages;
        volume.files = images;
        volume
    }

    /// A volume without pages, named from the source's path.
    fn container_volume(&self, paired: &PairedSource) -> ProcessedVolume {
        let names = derive_names(&paired.base_path, &self.config.generic_folder_names);
        let series_id = series_id_for(&names.series_name);
        let volume_id = image_only_volume_id(&series_id, &names.volume_name);
        debug!(
            "Derived series '{}' / volume '{}' for '{}'",
            names.series_name, names.volume_name, paired.base_path
        );

        ProcessedVolume {
            metadata: VolumeMetadata {
                volume_id,
                series_id,
                series_name: names.series_name,
                volume_name: names.volume_name,
                metadata_version: String::new(),
                page_count: 0,
                total_chars: 0,
                page_char_counts: Vec::new(),
                thumbnail: None,
                missing_pages: Vec::new(),
                mismatch: None,
                added_on: Utc::now(),
            },
            ocr_pages: Vec::new(),
            files: BTreeMap::new(),
            nested_sources: Vec::new(),
        }
    }

    fn placeholder_dimensions(&self, page: &MetadataPage) -> (u32, u32) {
        let width = page
            .img_width
            .filter(|w| *w > 0)
            .unwrap_or(self.config.placeholder_width);
        let height = page
            .img_height
            .filter(|h| *h > 0)
            .unwrap_or(self.config.placeholder_height);
        (
            width.min(MAX_PLACEHOLDER_DIMENSION),
            height.min(MAX_PLACEHOLDER_DIMENSION),
        )
    }

    /// Thumbnail of the first page backed by a real image; failures only log.
    async fn thumbnail_for(&self, volume: &ProcessedVolume) -> Option<Thumbnail> {
        let cover = volume
            .ocr_pages
            .iter()
            .filter_map(|page| volume.files.get(&page.img_path))
            .find(|blob| !blob.is_placeholder())?;

        match self.thumbnailer.generate(cover).await {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                warn!(
                    "Thumbnail generation failed for '{}': {}",
                    volume.metadata.volume_name, e
                );
                None
            }
        }
    }
}

/// Whether every image sits next to `sidecar` or below its same-stem folder.
///
/// Anything else belongs to another volume in the same archive.
fn owns_all_images(sidecar: &FileEntry, images: &BTreeMap<String, Blob>) -> bool {
    let dir = normalized_key(parent_dir(&sidecar.path));
    let stem_dir = normalized_key(&join(parent_dir(&sidecar.path), file_stem(sidecar.file_name())));
    images.keys().all(|path| {
        let path = normalized_key(path);
        parent_dir(&path) == dir || is_within(&stem_dir, &path)
    })
}

/// Renders one placeholder per distinct size, in parallel.
async fn render_placeholders(sizes: BTreeSet<(u32, u32)>) -> Result<HashMap<(u32, u32), Blob>> {
    spawn_blocking(move || {
        sizes
            .into_par_iter()
            .map(|(width, height)| {
                render_placeholder(width, height)
                    .map(|bytes| ((width, height), Blob::placeholder(bytes)))
            })
            .collect::<Result<HashMap<_, _>>>()
    })
    .await
    .map_err(|e| Error::AsyncTaskError(e.to_string()))?
}

/// A flat gray PNG with a border and both diagonals, marking a missing page.
pub fn render_placeholder(width: u32, height: u32) -> Result<Vec<u8>> {
    let (w, h) = (width as f64, height as f64);
    let diagonal = (w * w + h * h).sqrt();

    let canvas = RgbImage::from_fn(width, height, |x, y| {
        let on_border = x < PLACEHOLDER_BORDER
            || y < PLACEHOLDER_BORDER
            || x + PLACEHOLDER_BORDER >= width
            || y + PLACEHOLDER_BORDER >= height;
        let (px, py) = (x as f64, y as f64);
        let on_diagonal = (px * h - py * w).abs() / diagonal < 1.5
            || ((w - px) * h - py * w).abs() / diagonal < 1.5;

        if on_border || on_diagonal {
            PLACEHOLDER_INK
        } else {
            PLACEHOLDER_FILL
        }
    });

    let mut encoded = Cursor::new(Vec::new());
    canvas.write_to(&mut encoded, ImageFormat::Png)?;
    Ok(encoded.into_inner())
}
