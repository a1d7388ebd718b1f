use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::collaborators::{
    Decompressor, ImageThumbnailer, Thumbnailer, VolumeStore, ZipDecompressor,
};
use crate::error::{Error, Result};
use crate::naming::default_generic_folders;
use crate::pairing::pair_sources;
use crate::processor::VolumeProcessor;
use crate::routing::route;
use crate::types::{FileEntry, ImportResult, PairedSource, PairingResult, ProcessedVolume};

/// Import settings, built declaratively using the builder pattern.
///
/// Every field has a sensible default, so `ImportConfig::builder().build()` yields a
/// working configuration:
///
/// ```rust
/// # use yomikomi::prelude::*;
/// let config = ImportConfig::builder()
///     .placeholder_width(1000u32)
///     .generate_thumbnails(false)
///     .build()
///     .expect("Invalid configuration");
/// assert_eq!(config.placeholder_height, 1200);
/// ```
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ImportConfig {
    /// Parent-folder names that never become a series name for image-only volumes.
    ///
    /// Compared case-insensitively. See [`crate::naming::DEFAULT_GENERIC_FOLDERS`].
    #[builder(default = "default_generic_folders()")]
    pub generic_folder_names: Vec<String>,

    /// Placeholder width for missing pages that declare no size.
    #[builder(default = "800")]
    pub placeholder_width: u32,

    /// Placeholder height for missing pages that declare no size.
    #[builder(default = "1200")]
    pub placeholder_height: u32,

    /// Whether the processor asks the thumbnail collaborator for a cover.
    #[builder(default = "true")]
    pub generate_thumbnails: bool,

    /// Bounding box of [`ImageThumbnailer`] thumbnails.
    #[builder(default = "250")]
    pub thumbnail_max_width: u32,

    #[builder(default = "350")]
    pub thumbnail_max_height: u32,

    /// Number of queued pairings processed at the same time.
    #[builder(default = "num_cpus::get().clamp(1, 4)")]
    pub max_concurrent_volumes: usize,

    /// How deep archives inside archives are followed.
    ///
    /// Sources found below this depth are reported as warnings and not processed.
    #[builder(default = "8")]
    pub max_nesting_depth: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            generic_folder_names: default_generic_folders(),
            placeholder_width: 800,
            placeholder_height: 1200,
            generate_thumbnails: true,
            thumbnail_max_width: 250,
            thumbnail_max_height: 350,
            max_concurrent_volumes: num_cpus::get().clamp(1, 4),
            max_nesting_depth: 8,
        }
    }
}

impl ImportConfig {
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }
}

impl ImportConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(names) = &self.generic_folder_names {
            if names.iter().any(|name| name.trim().is_empty()) {
                return Err("Generic folder names must not be empty.".to_string());
            }
        }
        if self.placeholder_width == Some(0) || self.placeholder_height == Some(0) {
            return Err("Placeholder dimensions must be greater than 0.".to_string());
        }
        if self.thumbnail_max_width == Some(0) || self.thumbnail_max_height == Some(0) {
            return Err("Thumbnail dimensions must be greater than 0.".to_string());
        }
        if self.max_concurrent_volumes == Some(0) {
            return Err("max_concurrent_volumes must be at least 1.".to_string());
        }
        Ok(())
    }
}

/// What happened to one pairing.
enum Outcome {
    Imported { warnings: Vec<String> },
    /// The source only wrapped other sources; nothing of its own was saved.
    Container,
    Failed(String),
}

/// Batch importer: pair, route, process, save.
///
/// One item's failure is recorded in the result and never aborts its siblings.
///
/// ```rust,no_run
/// # use yomikomi::prelude::*;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> yomikomi::error::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let importer = Importer::with_defaults(ImportConfig::default(), store.clone());
///
/// let entries = collect_entries(std::path::Path::new("./manga")).await?;
/// let result = importer.import(entries).await;
/// println!("{} imported, {} failed", result.imported_count, result.failed_count);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Importer {
    config: ImportConfig,
    processor: Arc<VolumeProcessor>,
    store: Arc<dyn VolumeStore>,
}

impl Importer {
    pub fn new(
        config: ImportConfig,
        decompressor: Arc<dyn Decompressor>,
        thumbnailer: Arc<dyn Thumbnailer>,
        store: Arc<dyn VolumeStore>,
    ) -> Self {
        let processor = VolumeProcessor::new(config.clone(), decompressor, thumbnailer);
        Self {
            config,
            processor: Arc::new(processor),
            store,
        }
    }

    /// Importer using [`ZipDecompressor`] and an [`ImageThumbnailer`] sized from `config`.
    pub fn with_defaults(config: ImportConfig, store: Arc<dyn VolumeStore>) -> Self {
        let thumbnailer = ImageThumbnailer::from_config(&config);
        Self::new(
            config,
            Arc::new(ZipDecompressor::new()),
            Arc::new(thumbnailer),
            store,
        )
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn processor(&self) -> &VolumeProcessor {
        &self.processor
    }

    /// Runs the pairing engine without importing anything.
    pub fn pair(&self, entries: &[FileEntry]) -> PairingResult {
        pair_sources(entries)
    }

    /// Imports every volume found in one batch of files.
    ///
    /// # Arguments
    ///
    /// * `entries` - The files of the batch, with forward-slash paths
    ///
    /// # Returns
    ///
    /// * `ImportResult` - Counts of imported, failed and skipped (container) sources, the
    ///   literal error strings (`"<base path>: <error>"`) and all warnings; `success` is
    ///   true when nothing failed
    pub async fn import(&self, entries: Vec<FileEntry>) -> ImportResult {
        let pairing = pair_sources(&entries);
        let mut result = ImportResult {
            warnings: pairing.warnings,
            ..ImportResult::default()
        };

        let routing = route(pairing.pairings);
        let mut pending: Vec<(PairedSource, usize)> = Vec::new();

        if let Some(direct) = routing.direct_process {
            debug!("Processing single pairing '{}' directly", direct.base_path);
            let (outcome, nested) = self.import_one(&direct).await;
            Self::record(&mut result, outcome);
            pending.extend(nested.into_iter().map(|source| (source, 1)));
        } else {
            pending.extend(routing.queued.into_iter().map(|source| (source, 0)));
        }

        // Nested sources discovered by one round form the queue of the next.
        while !pending.is_empty() {
            let (runnable, too_deep): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, depth)| *depth <= self.config.max_nesting_depth);
            for (source, _) in too_deep {
                let warning = format!(
                    "{}: skipped, archives nested deeper than {} levels",
                    source.base_path, self.config.max_nesting_depth
                );
                warn!("{}", warning);
                result.warnings.push(warning);
            }

            let mut next = Vec::new();
            for ((outcome, nested), depth) in self.run_queue(runnable).await {
                Self::record(&mut result, outcome);
                next.extend(nested.into_iter().map(|source| (source, depth + 1)));
            }
            pending = next;
        }

        result.success = result.failed_count == 0;
        info!(
            "Import finished: {} imported, {} failed, {} skipped, {} warning(s)",
            result.imported_count,
            result.failed_count,
            result.skipped_count,
            result.warnings.len()
        );
        result
    }

    /// Processes queued pairings concurrently, bounded by `max_concurrent_volumes`.
    ///
    /// Results come back in queue order.
    async fn run_queue(
        &self,
        queue: Vec<(PairedSource, usize)>,
    ) -> Vec<((Outcome, Vec<PairedSource>), usize)> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_volumes));

        let tasks = queue.into_iter().map(|(source, depth)| {
            let importer = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let base_path = source.base_path.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await?;
                Result::Ok(importer.import_one(&source).await)
            });
            async move {
                let result = match handle.await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => (Outcome::Failed(format!("{}: {}", base_path, e)), Vec::new()),
                    Err(e) => (
                        Outcome::Failed(format!("{}: {}", base_path, Error::from(e))),
                        Vec::new(),
                    ),
                };
                (result, depth)
            }
        });

        join_all(tasks).await
    }

    /// Processes and saves one pairing, returning its outcome and any nested sources.
    async fn import_one(&self, source: &PairedSource) -> (Outcome, Vec<PairedSource>) {
        match self.process_and_save(source).await {
            Ok((outcome, nested)) => (outcome, nested),
            Err(e) => {
                warn!("Failed to import '{}': {}", source.base_path, e);
                (
                    Outcome::Failed(format!("{}: {}", source.base_path, e)),
                    Vec::new(),
                )
            }
        }
    }

    async fn process_and_save(
        &self,
        source: &PairedSource,
    ) -> Result<(Outcome, Vec<PairedSource>)> {
        let mut volume: ProcessedVolume = self.processor.process_source(source).await?;
        let nested = std::mem::take(&mut volume.nested_sources);

        if volume.is_container() {
            debug!(
                "'{}' only contains other sources ({})",
                source.base_path,
                nested.len()
            );
            return Ok((Outcome::Container, nested));
        }

        let volume_id = volume.metadata.volume_id.clone();
        if self.store.exists(&volume_id).await? {
            return Err(Error::DuplicateVolume(volume_id));
        }

        let mut warnings: Vec<String> = volume
            .metadata
            .missing_pages
            .iter()
            .map(|page| {
                format!(
                    "{}: page '{}' is missing, a placeholder was used",
                    source.base_path, page
                )
            })
            .collect();
        if let Some(mismatch) = &volume.metadata.mismatch {
            if !mismatch.extra_files.is_empty() {
                warnings.push(format!(
                    "{}: {} image(s) not referenced by the mokuro file were not imported: {}",
                    source.base_path,
                    mismatch.extra_files.len(),
                    mismatch.extra_files.join(", ")
                ));
            }
        }

        self.store.save(volume).await?;
        debug!("Saved volume '{}' from '{}'", volume_id, source.base_path);
        Ok((Outcome::Imported { warnings }, nested))
    }

    fn record(result: &mut ImportResult, outcome: Outcome) {
        match outcome {
            Outcome::Imported { warnings } => {
                result.imported_count += 1;
                result.warnings.extend(warnings);
            }
            Outcome::Container => result.skipped_count += 1,
            Outcome::Failed(error) => {
                result.failed_count += 1;
                result.errors.push(error);
            }
        }
    }
}
