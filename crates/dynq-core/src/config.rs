//! Engine configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DynqError, Result};

/// Safety bounds for paginated collection
///
/// All three bounds apply at once; whichever trips first ends the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorLimits {
    /// Maximum number of pages fetched for a single query
    max_pages: u32,
    /// Maximum number of rows accumulated for a single query
    max_items: usize,
    /// Wall-clock budget for the whole collection, in milliseconds
    max_duration_ms: u64,
}

impl CollectorLimits {
    pub fn new(max_pages: u32, max_items: usize, max_duration_ms: u64) -> Self {
        Self {
            max_pages,
            max_items,
            max_duration_ms,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_max_duration_ms(mut self, duration_ms: u64) -> Self {
        self.max_duration_ms = duration_ms;
        self
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

impl Default for CollectorLimits {
    fn default() -> Self {
        Self {
            max_pages: 1000,
            max_items: 1_000_000,
            max_duration_ms: 60_000, // 1 minute
        }
    }
}

/// Per-datasource engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Table described by the health check
    connection_test_table: String,
    collector: CollectorLimits,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| DynqError::Configuration(e.to_string()))
    }

    /// Load settings from the host's JSON settings blob
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| DynqError::Configuration(e.to_string()))
    }

    pub fn with_connection_test_table(mut self, table: impl Into<String>) -> Self {
        self.connection_test_table = table.into();
        self
    }

    pub fn with_collector_limits(mut self, limits: CollectorLimits) -> Self {
        self.collector = limits;
        self
    }

    pub fn connection_test_table(&self) -> &str {
        &self.connection_test_table
    }

    pub fn collector_limits(&self) -> &CollectorLimits {
        &self.collector
    }
}
