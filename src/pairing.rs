//! The pairing engine.
//!
//! Matches every mokuro sidecar to at most one image source, then turns the sources
//! nobody claimed into standalone pairings. The engine runs ordered passes; each pass
//! only sees sidecars and sources that earlier passes left unclaimed:
//!
//! 1. same directory: the sidecar sits next to its images
//! 2. same-stem archive: `vol01.mokuro` next to `vol01.cbz`
//! 3. same-stem directory: `vol01.mokuro` next to `vol01/`
//! 4. table of contents: the sidecar's folder has chapter subfolders only
//! 5. unclaimed archives become pairings without a sidecar
//! 6. unclaimed image folders become image-only pairings
//!
//! A sidecar only ever claims sources inside its own directory, so two series folders
//! that happen to contain identically named volumes never steal from each other.
//! The whole computation is a pure function of its input.

use std::collections::HashSet;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::assembler::SourceCandidates;
use crate::naming::stable_id;
use crate::path_utils::{file_name, file_stem, is_within, join, normalized_key, parent_dir};
use crate::types::{FileEntry, PairedSource, PairingResult, Source};

impl PairedSource {
    /// Builds a pairing whose id is derived from what it pairs.
    ///
    /// Pairing the same input twice therefore yields identical pairings.
    pub fn new(
        source: Source,
        base_path: impl Into<String>,
        metadata_file: Option<FileEntry>,
        image_only: bool,
    ) -> Self {
        let base_path = base_path.into();
        let metadata_path = metadata_file.as_ref().map_or("", |m| m.path.as_str());
        // Sibling archives share a base path when only their extensions differ
        let location = match &source {
            Source::Archive { archive_file } => archive_file.path.as_str(),
            Source::Directory { .. } | Source::TocDirectory { .. } => base_path.as_str(),
        };
        let id = stable_id(&[
            "source",
            source.kind().as_str(),
            base_path.as_str(),
            location,
            metadata_path,
        ]);
        Self::with_id(id, source, base_path, metadata_file, image_only)
    }

    /// Builds a pairing with an explicit id (used for sources found inside other sources).
    pub fn with_id(
        id: Uuid,
        source: Source,
        base_path: impl Into<String>,
        metadata_file: Option<FileEntry>,
        image_only: bool,
    ) -> Self {
        let estimated_size_bytes = source.estimated_size_bytes()
            + metadata_file
                .as_ref()
                .map_or(0, |m| m.content.len() as u64);
        Self {
            id,
            metadata_file,
            source,
            base_path: base_path.into(),
            estimated_size_bytes,
            image_only,
        }
    }
}

/// Warning emitted for a sidecar that no pass could pair.
pub fn orphan_warning(path: &str) -> String {
    format!(
        "Orphaned mokuro file: {} (no matching images or archive)",
        path
    )
}

/// Pairs sidecars with image sources.
///
/// # Arguments
///
/// * `entries` - The full, flat list of files of one import call; ignorable paths are skipped
///
/// # Returns
///
/// * `PairingResult` - Pairings in pass order, plus one warning per orphaned sidecar
pub fn pair_sources(entries: &[FileEntry]) -> PairingResult {
    let candidates = SourceCandidates::assemble(entries);
    let mut engine = PairingEngine::new(&candidates);

    engine.same_directory_pass();
    engine.same_stem_archive_pass();
    engine.same_stem_directory_pass();
    engine.toc_pass();
    engine.unclaimed_archive_pass();
    engine.unclaimed_directory_pass();

    let result = engine.finish();
    info!(
        "Paired {} source(s) from {} file(s), {} warning(s)",
        result.pairings.len(),
        entries.len(),
        result.warnings.len()
    );
    result
}

/// Per-call bookkeeping; nothing outlives one `pair_sources` call.
struct PairingEngine<'a> {
    candidates: &'a SourceCandidates,
    metadata: Vec<&'a FileEntry>,
    claimed_metadata: HashSet<&'a str>,
    claimed_directories: HashSet<String>,
    claimed_archives: HashSet<&'a str>,
    pairings: Vec<PairedSource>,
}

impl<'a> PairingEngine<'a> {
    fn new(candidates: &'a SourceCandidates) -> Self {
        Self {
            candidates,
            metadata: candidates.metadata_files(),
            claimed_metadata: HashSet::new(),
            claimed_directories: HashSet::new(),
            claimed_archives: HashSet::new(),
            pairings: Vec::new(),
        }
    }

    /// Sidecars still waiting for a source, in traversal order.
    fn unclaimed_metadata(&self) -> Vec<&'a FileEntry> {
        self.metadata
            .iter()
            .copied()
            .filter(|m| !self.claimed_metadata.contains(m.path.as_str()))
            .collect()
    }

    fn directory_available(&self, dir: &str) -> bool {
        !self.claimed_directories.contains(dir)
    }

    /// A sidecar may only claim sources inside its own directory.
    fn in_scope(metadata: &FileEntry, source_path: &str) -> bool {
        is_within(parent_dir(&metadata.path), source_path)
    }

    fn metadata_stem(metadata: &FileEntry) -> String {
        normalized_key(file_stem(metadata.file_name()))
    }

    /// Unclaimed sibling directory whose name equals the sidecar's stem.
    fn stem_directory(&self, metadata: &FileEntry) -> Option<&'a str> {
        let dir = parent_dir(&metadata.path);
        let stem = Self::metadata_stem(metadata);
        self.candidates
            .subdirectories(dir)
            .into_iter()
            .filter(|sub| self.directory_available(sub))
            .find(|sub| normalized_key(file_name(sub)) == stem)
    }

    /// Chapter folders of `dir` that no other pairing has taken.
    fn available_chapters(&self, dir: &str) -> Vec<&'a str> {
        self.candidates
            .toc_chapters(dir)
            .into_iter()
            .filter(|chapter| self.directory_available(chapter))
            .collect()
    }

    fn claim(&mut self, metadata: &'a FileEntry, source: Source, base_path: String) {
        debug!(
            "Paired '{}' with {} source '{}'",
            metadata.path,
            source.kind(),
            base_path
        );
        self.claimed_metadata.insert(metadata.path.as_str());
        self.pairings.push(PairedSource::new(
            source,
            base_path,
            Some(metadata.clone()),
            false,
        ));
    }

    fn claim_toc(&mut self, metadata: &'a FileEntry, dir: &str, chapters: &[&'a str]) {
        let source = self.candidates.toc_source(dir, chapters);
        self.claimed_directories.insert(dir.to_string());
        for chapter in chapters {
            self.claimed_directories.insert(chapter.to_string());
        }
        self.claim(metadata, source, dir.to_string());
    }

    fn same_directory_pass(&mut self) {
        for metadata in self.unclaimed_metadata() {
            let dir = parent_dir(&metadata.path);
            if !self.directory_available(dir) || !Self::in_scope(metadata, dir) {
                continue;
            }
            if let Some(source) = self.candidates.directory_source(dir) {
                self.claimed_directories.insert(dir.to_string());
                self.claim(metadata, source, dir.to_string());
            }
        }
    }

    fn same_stem_archive_pass(&mut self) {
        for metadata in self.unclaimed_metadata() {
            // Already-decompressed folders win over a redundant archive of the same name.
            if let Some(sub) = self.stem_directory(metadata) {
                if self.candidates.has_images(sub) || !self.available_chapters(sub).is_empty() {
                    continue;
                }
            }

            let dir = parent_dir(&metadata.path);
            let stem = Self::metadata_stem(metadata);
            let archive = self.candidates.directory(dir).and_then(|node| {
                node.archives.iter().find(|archive| {
                    !self.claimed_archives.contains(archive.path.as_str())
                        && normalized_key(file_stem(archive.file_name())) == stem
                        && Self::in_scope(metadata, &archive.path)
                })
            });

            if let Some(archive) = archive {
                self.claimed_archives.insert(archive.path.as_str());
                let base_path = join(dir, file_stem(archive.file_name()));
                self.claim(
                    metadata,
                    Source::Archive {
                        archive_file: archive.clone(),
                    },
                    base_path,
                );
            }
        }
    }

    fn same_stem_directory_pass(&mut self) {
        for metadata in self.unclaimed_metadata() {
            let Some(sub) = self.stem_directory(metadata) else {
                continue;
            };
            if !Self::in_scope(metadata, sub) {
                continue;
            }

            if let Some(source) = self.candidates.directory_source(sub) {
                self.claimed_directories.insert(sub.to_string());
                self.claim(metadata, source, sub.to_string());
                continue;
            }

            let chapters = self.available_chapters(sub);
            if !chapters.is_empty() {
                self.claim_toc(metadata, sub, &chapters);
            }
        }
    }

    fn toc_pass(&mut self) {
        for metadata in self.unclaimed_metadata() {
            let dir = parent_dir(&metadata.path);
            if !self.directory_available(dir) || self.candidates.has_images(dir) {
                continue;
            }
            let chapters: Vec<&'a str> = self
                .available_chapters(dir)
                .into_iter()
                .filter(|chapter| Self::in_scope(metadata, chapter))
                .collect();
            if !chapters.is_empty() {
                self.claim_toc(metadata, dir, &chapters);
            }
        }
    }

    fn unclaimed_archive_pass(&mut self) {
        for archive in self.candidates.archives() {
            if self.claimed_archives.contains(archive.path.as_str()) {
                continue;
            }
            self.claimed_archives.insert(archive.path.as_str());
            let base_path = join(parent_dir(&archive.path), file_stem(archive.file_name()));
            debug!("Standalone archive pairing for '{}'", archive.path);
            self.pairings.push(PairedSource::new(
                Source::Archive {
                    archive_file: archive.clone(),
                },
                base_path,
                None,
                false,
            ));
        }
    }

    fn unclaimed_directory_pass(&mut self) {
        for dir in self.candidates.image_directories() {
            if !self.directory_available(dir) {
                continue;
            }
            let Some(source) = self.candidates.directory_source(dir) else {
                continue;
            };
            self.claimed_directories.insert(dir.to_string());
            debug!("Image-only pairing for '{}'", dir);
            self.pairings
                .push(PairedSource::new(source, dir.to_string(), None, true));
        }
    }

    fn finish(self) -> PairingResult {
        let warnings = self
            .unclaimed_metadata()
            .into_iter()
            .map(|metadata| {
                warn!("No images or archive found for '{}'", metadata.path);
                orphan_warning(&metadata.path)
            })
            .collect();
        PairingResult {
            pairings: self.pairings,
            warnings,
        }
    }
}
