//! Upload service: preview, dry run, and execution of preset uploads

use std::collections::BTreeMap;
use std::sync::Arc;

use dynq_core::{
    ConsumedCapacity, DynqError, Result, SourceRow, StatementRequest, StoreTransport, row_to_json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plan::{UploadPlan, build_upload_plan};
use crate::preset::{UploadOperation, UploadPreset, UploadPresetSummary};
use crate::settings::UploadSettings;
use crate::store::PresetStore;

/// An upload request from the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRequest {
    pub preset_id: String,
    pub items: Vec<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl UploadRequest {
    pub fn new(preset_id: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            preset_id: preset_id.into(),
            items,
            ..Default::default()
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Parse a raw request body, stripping stray control bytes first
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(DynqError::Validation("request body is required".to_string()));
        }

        let sanitized = sanitize_json(body);
        tracing::debug!(
            body_len = sanitized.len(),
            original_len = body.len(),
            "received upload request body"
        );

        serde_json::from_slice(&sanitized)
            .map_err(|e| DynqError::Validation(format!("invalid request payload: {}", e)))
    }
}

/// Drop control bytes other than tab, LF and CR
pub fn sanitize_json(body: &[u8]) -> Vec<u8> {
    body.iter()
        .copied()
        .filter(|b| matches!(b, b'\t' | b'\n' | b'\r') || *b >= 0x20)
        .collect()
}

/// Error text safe to embed in a JSON string body
pub fn sanitize_error(err: &DynqError) -> String {
    err.to_string().replace('"', "'")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPreviewResponse {
    pub preset: UploadPresetSummary,
    pub item_count: usize,
    pub statements: Vec<String>,
    pub payload_size_bytes: usize,
    /// One unit per statement
    #[serde(rename = "estimatedCapacityUnits", skip_serializing_if = "is_zero_units")]
    pub estimated_capacity_units: f64,
}

fn is_zero_units(units: &f64) -> bool {
    *units == 0.0
}

/// Capacity consumed per table across an upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedCapacitySummary {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub table_name: String,
    pub capacity_units: f64,
    #[serde(skip_serializing_if = "is_zero_units")]
    pub read_units: f64,
    #[serde(skip_serializing_if = "is_zero_units")]
    pub write_units: f64,
    /// Requests that reported zero capacity for a named table
    #[serde(skip_serializing_if = "is_zero_events")]
    pub throttle_events: u64,
}

fn is_zero_events(events: &u64) -> bool {
    *events == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadExecuteResponse {
    pub preset: UploadPresetSummary,
    pub item_count: usize,
    pub statements: Vec<String>,
    pub payload_size_bytes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumed_capacity: Vec<ConsumedCapacitySummary>,
    /// Rows returned by select presets, as plain JSON
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What an execute call produced
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The request was a dry run; nothing was written
    DryRun(UploadPreviewResponse),
    Executed(UploadExecuteResponse),
}

/// Sum capacity per table, ordered by table name
pub fn aggregate_consumed_capacity(reports: &[ConsumedCapacity]) -> Vec<ConsumedCapacitySummary> {
    let mut by_table: BTreeMap<String, ConsumedCapacitySummary> = BTreeMap::new();

    for report in reports {
        let key = report.table_name.clone().unwrap_or_default();
        let entry = by_table
            .entry(key.clone())
            .or_insert_with(|| ConsumedCapacitySummary {
                table_name: key,
                ..Default::default()
            });

        entry.capacity_units += report.capacity_units.unwrap_or_default();
        entry.read_units += report.read_capacity_units.unwrap_or_default();
        entry.write_units += report.write_capacity_units.unwrap_or_default();
        if report.capacity_units == Some(0.0) && report.table_name.is_some() {
            entry.throttle_events += 1;
        }
    }

    by_table.into_values().collect()
}

fn decode_results(rows: &[SourceRow]) -> Result<Vec<serde_json::Map<String, Value>>> {
    rows.iter()
        .map(|row| row_to_json(row).map_err(|e| e.context("failed to decode result item")))
        .collect()
}

/// Entry point for preset-driven uploads
pub struct UploadService {
    store: Arc<dyn PresetStore>,
    settings: UploadSettings,
}

impl UploadService {
    pub fn new(store: Arc<dyn PresetStore>, settings: UploadSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn PresetStore> {
        &self.store
    }

    /// Stored presets first, then configured presets not shadowed by id
    pub fn presets(&self) -> Vec<UploadPresetSummary> {
        let mut summaries = self.store.list();
        for preset in self.settings.presets() {
            if !summaries.iter().any(|s| s.id == preset.id) {
                summaries.push(preset.summarize());
            }
        }
        summaries
    }

    /// Find a preset in the store, falling back to the configuration
    pub fn resolve_preset(&self, id: &str) -> Result<UploadPreset> {
        if let Some(preset) = self.store.load(id) {
            return Ok(preset);
        }

        tracing::warn!(preset_id = id, "preset not in store, trying datasource config");
        self.settings.find_preset(id)
    }

    /// Summary of a single preset
    #[tracing::instrument(skip(self))]
    pub fn schema(&self, preset_id: &str) -> Result<UploadPresetSummary> {
        if preset_id.is_empty() {
            return Err(DynqError::Validation("presetId is required".to_string()));
        }
        Ok(self.resolve_preset(preset_id)?.summarize())
    }

    fn prepare(&self, request: &UploadRequest) -> Result<(UploadPreset, UploadPlan)> {
        if request.preset_id.is_empty() {
            return Err(DynqError::Validation("presetId is required".to_string()));
        }

        let preset = self.resolve_preset(&request.preset_id)?;
        tracing::info!(
            preset_id = %preset.id,
            table = %preset.table,
            operation = %preset.operation,
            "preset loaded"
        );

        let plan = build_upload_plan(&preset, self.settings.max_upload_payload_kb(), &request.items)?;
        Ok((preset, plan))
    }

    fn preview_response(preset: &UploadPreset, request: &UploadRequest, plan: &UploadPlan) -> UploadPreviewResponse {
        UploadPreviewResponse {
            preset: preset.summarize(),
            item_count: request.items.len(),
            statements: plan.previews(),
            payload_size_bytes: plan.payload_size_bytes,
            estimated_capacity_units: plan.len() as f64,
        }
    }

    fn ensure_dry_run_allowed(preset: &UploadPreset) -> Result<()> {
        if preset.allow_dry_run {
            Ok(())
        } else {
            Err(DynqError::Forbidden("dry run is disabled for this preset".to_string()))
        }
    }

    /// Build and render the statements without executing them
    #[tracing::instrument(skip(self, request), fields(preset_id = %request.preset_id, items = request.items.len()))]
    pub fn preview(&self, request: &UploadRequest) -> Result<UploadPreviewResponse> {
        let (preset, plan) = self.prepare(request)?;
        Self::ensure_dry_run_allowed(&preset)?;

        tracing::info!(preset_id = %preset.id, items = request.items.len(), "upload preview generated");
        Ok(Self::preview_response(&preset, request, &plan))
    }

    /// Execute every statement in order, stopping at the first failure
    #[tracing::instrument(
        skip(self, request, transport),
        fields(preset_id = %request.preset_id, items = request.items.len(), dry_run = request.dry_run)
    )]
    pub async fn execute(
        &self,
        request: &UploadRequest,
        transport: &dyn StoreTransport,
    ) -> Result<UploadOutcome> {
        let (preset, plan) = self.prepare(request)?;

        if request.dry_run {
            Self::ensure_dry_run_allowed(&preset)?;
            tracing::info!(preset_id = %preset.id, "upload execute called as dry run");
            return Ok(UploadOutcome::DryRun(Self::preview_response(&preset, request, &plan)));
        }

        let mut consumed = Vec::new();
        let mut selected: Vec<SourceRow> = Vec::new();

        for (index, built) in plan.statements.iter().enumerate() {
            let statement = StatementRequest::new(built.statement.clone())
                .with_parameters(built.parameters.clone())
                .with_consumed_capacity();

            let page = transport.execute_statement(statement).await.map_err(|err| {
                tracing::error!(preset_id = %preset.id, statement_index = index, error = %err, "upload execute failed");
                DynqError::Remote(format!(
                    "failed to execute statement {}: {}",
                    index + 1,
                    message_of(err)
                ))
            })?;

            if let Some(capacity) = page.consumed_capacity {
                consumed.push(capacity);
            }
            if preset.operation == UploadOperation::Select {
                selected.extend(page.items);
            }
        }

        let mut response = UploadExecuteResponse {
            preset: preset.summarize(),
            item_count: plan.len(),
            statements: plan.previews(),
            payload_size_bytes: plan.payload_size_bytes,
            consumed_capacity: aggregate_consumed_capacity(&consumed),
            results: Vec::new(),
            warnings: Vec::new(),
        };

        if preset.operation == UploadOperation::Select {
            match decode_results(&selected) {
                Ok(rows) => response.results = rows,
                Err(err) => {
                    tracing::error!(error = %err, "failed to decode select results");
                    response
                        .warnings
                        .push(format!("failed to decode select results: {}", message_of(err)));
                }
            }
        }

        tracing::info!(preset_id = %preset.id, statements = plan.len(), "upload execute completed");
        Ok(UploadOutcome::Executed(response))
    }
}

/// The inner message of an error, without its category prefix
fn message_of(err: DynqError) -> String {
    match err {
        DynqError::Validation(msg)
        | DynqError::Decode(msg)
        | DynqError::Remote(msg)
        | DynqError::Timeout(msg)
        | DynqError::LimitExceeded(msg)
        | DynqError::NotFound(msg)
        | DynqError::Forbidden(msg)
        | DynqError::Configuration(msg) => msg,
        other => other.to_string(),
    }
}
