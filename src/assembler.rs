//! Source assembly.
//!
//! Builds an in-memory directory tree out of a flat list of entries and answers the
//! questions the pairing engine asks about it: which directories hold page images
//! directly, which qualify as table-of-contents folders, and which archives and
//! sidecars live where.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::classify::classify;
use crate::path_utils::{compare_natural, file_name, parent_dir, relative_to};
use crate::types::{Blob, FileEntry, FileKind, Source};

/// Direct contents of one directory.
#[derive(Debug, Default, Clone)]
pub struct DirectoryNode {
    pub images: Vec<FileEntry>,
    pub metadata: Vec<FileEntry>,
    pub archives: Vec<FileEntry>,
    /// Full paths of the direct subdirectories.
    pub subdirs: BTreeSet<String>,
}

impl DirectoryNode {
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// A chapter folder holds images and nothing that would make it a volume of its own.
    pub fn is_chapter(&self) -> bool {
        self.has_images() && self.metadata.is_empty() && self.archives.is_empty()
    }
}

/// Directory tree over the non-ignorable entries of one import call.
#[derive(Debug, Default, Clone)]
pub struct SourceCandidates {
    directories: BTreeMap<String, DirectoryNode>,
}

impl SourceCandidates {
    /// Classifies every entry and files it under its parent directory.
    ///
    /// Ignorable entries are dropped. When the same path appears twice the first
    /// occurrence wins.
    pub fn assemble(entries: &[FileEntry]) -> Self {
        let mut candidates = SourceCandidates::default();
        candidates.directories.insert(String::new(), DirectoryNode::default());

        let mut seen: HashSet<&str> = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.path.as_str()) {
                continue;
            }
            let kind = classify(&entry.path);
            if kind == FileKind::Ignorable {
                continue;
            }

            let dir = parent_dir(&entry.path);
            candidates.register_directory(dir);
            let node = candidates
                .directories
                .entry(dir.to_string())
                .or_default();
            match kind {
                FileKind::Image => node.images.push(entry.clone()),
                FileKind::Metadata => node.metadata.push(entry.clone()),
                FileKind::Archive => node.archives.push(entry.clone()),
                FileKind::Ignorable => {}
            }
        }

        for node in candidates.directories.values_mut() {
            node.images.sort_by(|a, b| compare_natural(&a.path, &b.path));
            node.metadata.sort_by(|a, b| compare_natural(&a.path, &b.path));
            node.archives.sort_by(|a, b| compare_natural(&a.path, &b.path));
        }
        candidates
    }

    /// Creates the node for `dir` and links every ancestor down to it.
    fn register_directory(&mut self, dir: &str) {
        let mut current = dir;
        while !current.is_empty() {
            let parent = parent_dir(current);
            let inserted = self
                .directories
                .entry(parent.to_string())
                .or_default()
                .subdirs
                .insert(current.to_string());
            self.directories.entry(current.to_string()).or_default();
            if !inserted {
                break;
            }
            current = parent;
        }
    }

    pub fn directory(&self, path: &str) -> Option<&DirectoryNode> {
        self.directories.get(path)
    }

    pub fn has_images(&self, path: &str) -> bool {
        self.directory(path).is_some_and(DirectoryNode::has_images)
    }

    /// Every sidecar, in natural path order.
    pub fn metadata_files(&self) -> Vec<&FileEntry> {
        let mut files: Vec<&FileEntry> = self
            .directories
            .values()
            .flat_map(|node| node.metadata.iter())
            .collect();
        files.sort_by(|a, b| compare_natural(&a.path, &b.path));
        files
    }

    /// Every archive, in natural path order.
    pub fn archives(&self) -> Vec<&FileEntry> {
        let mut archives: Vec<&FileEntry> = self
            .directories
            .values()
            .flat_map(|node| node.archives.iter())
            .collect();
        archives.sort_by(|a, b| compare_natural(&a.path, &b.path));
        archives
    }

    /// Paths of all directories that hold images directly, in natural order.
    pub fn image_directories(&self) -> Vec<&str> {
        let mut dirs: Vec<&str> = self
            .directories
            .iter()
            .filter(|(_, node)| node.has_images())
            .map(|(path, _)| path.as_str())
            .collect();
        dirs.sort_by(|a, b| compare_natural(a, b));
        dirs
    }

    /// Direct subdirectories of `path`, in natural order.
    pub fn subdirectories(&self, path: &str) -> Vec<&str> {
        let mut dirs: Vec<&str> = self
            .directory(path)
            .map(|node| node.subdirs.iter().map(String::as_str).collect())
            .unwrap_or_default();
        dirs.sort_by(|a, b| compare_natural(a, b));
        dirs
    }

    /// Chapter subfolders of `path` when it qualifies as a table-of-contents folder.
    ///
    /// A TOC folder has no images of its own and at least one subfolder that holds
    /// only images. Returns an empty list otherwise.
    pub fn toc_chapters(&self, path: &str) -> Vec<&str> {
        if self.has_images(path) {
            return Vec::new();
        }
        self.subdirectories(path)
            .into_iter()
            .filter(|sub| self.directory(sub).is_some_and(DirectoryNode::is_chapter))
            .collect()
    }

    /// `Directory` source over the direct images of `path`.
    pub fn directory_source(&self, path: &str) -> Option<Source> {
        let node = self.directory(path).filter(|node| node.has_images())?;
        let files = node
            .images
            .iter()
            .map(|image| (file_name(&image.path).to_string(), image.content.clone()))
            .collect();
        Some(Source::Directory { files })
    }

    /// `TocDirectory` source over the given chapter folders of `path`.
    pub fn toc_source(&self, path: &str, chapters: &[&str]) -> Source {
        let chapters = chapters
            .iter()
            .filter_map(|chapter| {
                let node = self.directory(chapter)?;
                let files: BTreeMap<String, Blob> = node
                    .images
                    .iter()
                    .map(|image| {
                        (
                            relative_to(chapter, &image.path).to_string(),
                            image.content.clone(),
                        )
                    })
                    .collect();
                Some((relative_to(path, chapter).to_string(), files))
            })
            .collect();
        Source::TocDirectory { chapters }
    }
}
