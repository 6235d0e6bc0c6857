//! DYNQ Upload - Preset-driven write statements for the store
//!
//! A preset names a table, an operation and a field schema. Each item of an
//! upload request becomes one parameterized PartiQL statement:
//!
//! - `insert` - `INSERT INTO "T" VALUE {'a': ?, ...}` over the item's fields
//! - `update` - `UPDATE "T" SET ... WHERE ...` split on key fields
//! - `delete` / `select` - equality predicates over the item's fields
//!
//! Presets with a `partiqlTemplate` bind schema fields positionally instead,
//! with per-field type coercion.

mod coercion;
mod plan;
mod preset;
mod preview;
mod service;
mod settings;
mod statement;
mod store;

pub use coercion::{CoercionError, FieldKind, coerce_value, marshal_value, trim_trailing_zeros};
pub use plan::{UploadPlan, build_upload_plan, validate_item};
pub use preset::{
    FALLBACK_MAX_PAYLOAD_KB, UploadField, UploadOperation, UploadPreset, UploadPresetSummary,
};
pub use preview::{format_parameter, format_value, placeholder_positions, render_template};
pub use service::{
    ConsumedCapacitySummary, UploadExecuteResponse, UploadOutcome, UploadPreviewResponse,
    UploadRequest, UploadService, aggregate_consumed_capacity, sanitize_error, sanitize_json,
};
pub use settings::UploadSettings;
pub use statement::{BuiltStatement, build_statement_for_item};
pub use store::{MemoryPresetStore, PresetStore};

#[cfg(test)]
mod coercion_tests;
#[cfg(test)]
mod plan_tests;
#[cfg(test)]
mod service_tests;
#[cfg(test)]
mod statement_tests;
