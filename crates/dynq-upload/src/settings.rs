//! Upload settings carried in the datasource configuration

use dynq_core::{DynqError, Result};
use serde::{Deserialize, Serialize};

use crate::preset::UploadPreset;

/// Presets and limits configured on the datasource itself
///
/// Reads the same settings document as `EngineConfig`; unrelated keys are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    #[serde(rename = "uploadPresets")]
    presets: Vec<UploadPreset>,
    /// Installation-wide payload cap in KB; non-positive means unset
    #[serde(rename = "maxUploadPayloadKB")]
    max_upload_payload_kb: i64,
}

impl UploadSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| DynqError::Configuration(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| DynqError::Configuration(e.to_string()))
    }

    pub fn with_preset(mut self, preset: UploadPreset) -> Self {
        self.presets.push(preset);
        self
    }

    pub fn with_max_upload_payload_kb(mut self, max_kb: i64) -> Self {
        self.max_upload_payload_kb = max_kb;
        self
    }

    pub fn presets(&self) -> &[UploadPreset] {
        &self.presets
    }

    pub fn max_upload_payload_kb(&self) -> i64 {
        self.max_upload_payload_kb
    }

    /// Clone of the configured preset with `id`, its payload cap defaulted
    /// to the installation-wide cap when unset
    pub fn find_preset(&self, id: &str) -> Result<UploadPreset> {
        let preset = self
            .presets
            .iter()
            .find(|preset| preset.id == id)
            .ok_or_else(|| DynqError::NotFound(format!("upload preset {:?} not found", id)))?;

        let mut clone = preset.clone();
        if clone.max_payload_kb <= 0 {
            clone.max_payload_kb = self.max_upload_payload_kb;
        }
        Ok(clone)
    }
}
