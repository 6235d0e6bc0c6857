//! Preset storage

use dynq_core::{DynqError, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::preset::{UploadPreset, UploadPresetSummary};

/// Durable home of saved presets, keyed by id
pub trait PresetStore: Send + Sync {
    fn load(&self, id: &str) -> Option<UploadPreset>;

    fn list(&self) -> Vec<UploadPresetSummary>;

    /// Insert or replace a preset after checking its required fields
    fn save(&self, preset: UploadPreset) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory preset store, in insertion order
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: RwLock<IndexMap<String, UploadPreset>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.presets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.read().is_empty()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load(&self, id: &str) -> Option<UploadPreset> {
        self.presets.read().get(id).cloned()
    }

    fn list(&self) -> Vec<UploadPresetSummary> {
        self.presets.read().values().map(UploadPreset::summarize).collect()
    }

    fn save(&self, preset: UploadPreset) -> Result<()> {
        preset.validate_for_save()?;
        tracing::info!(id = %preset.id, table = %preset.table, "saving preset");
        self.presets.write().insert(preset.id.clone(), preset);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        match self.presets.write().shift_remove(id) {
            Some(_) => {
                tracing::info!(id, "deleted preset");
                Ok(())
            }
            None => Err(DynqError::NotFound(format!("preset {:?} not found", id))),
        }
    }
}
