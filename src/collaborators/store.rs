use crate::collaborators::VolumeStore;
use crate::error::{Error, Result};
use crate::types::{Blob, OcrPage, ProcessedVolume, VolumeMetadata};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    volumes: HashMap<String, VolumeMetadata>,
    ocr: HashMap<String, Vec<OcrPage>>,
    files: HashMap<String, BTreeMap<String, Blob>>,
}

/// In-memory [`VolumeStore`] with one table per record kind.
///
/// All three tables sit behind a single lock, so a save or delete is observed
/// either completely or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn volume(&self, volume_id: &str) -> Option<VolumeMetadata> {
        self.tables.read().await.volumes.get(volume_id).cloned()
    }

    pub async fn ocr_pages(&self, volume_id: &str) -> Option<Vec<OcrPage>> {
        self.tables.read().await.ocr.get(volume_id).cloned()
    }

    pub async fn files(&self, volume_id: &str) -> Option<BTreeMap<String, Blob>> {
        self.tables.read().await.files.get(volume_id).cloned()
    }

    /// Ids of all stored volumes, sorted.
    pub async fn volume_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.read().await.volumes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.volumes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl VolumeStore for MemoryStore {
    async fn exists(&self, volume_id: &str) -> Result<bool> {
        Ok(self.tables.read().await.volumes.contains_key(volume_id))
    }

    async fn save(&self, volume: ProcessedVolume) -> Result<()> {
        let mut tables = self.tables.write().await;
        let volume_id = volume.metadata.volume_id.clone();
        if tables.volumes.contains_key(&volume_id) {
            return Err(Error::DuplicateVolume(volume_id));
        }

        tables.ocr.insert(volume_id.clone(), volume.ocr_pages);
        tables.files.insert(volume_id.clone(), volume.files);
        tables.volumes.insert(volume_id, volume.metadata);
        Ok(())
    }

    async fn delete(&self, volume_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.volumes.remove(volume_id).is_none() {
            return Err(Error::NotFound(format!("Volume '{}'", volume_id)));
        }
        tables.ocr.remove(volume_id);
        tables.files.remove(volume_id);
        Ok(())
    }
}
