//! Upload plans: validated, size-budgeted statements for a batch of items

use dynq_core::{DynqError, Result};
use serde_json::{Map, Value};

use crate::preset::UploadPreset;
use crate::statement::{BuiltStatement, build_statement_for_item};

/// Statements for every item of an upload request
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPlan {
    pub statements: Vec<BuiltStatement>,
    /// Total serialized size of all items
    pub payload_size_bytes: usize,
}

impl UploadPlan {
    pub fn previews(&self) -> Vec<String> {
        self.statements.iter().map(|s| s.preview.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Check an item's fields against the preset schema
///
/// A preset without a schema accepts anything.
pub fn validate_item(preset: &UploadPreset, item: &Map<String, Value>) -> Result<()> {
    if preset.schema.is_empty() {
        return Ok(());
    }

    for field in preset.schema.iter().filter(|f| !f.name.is_empty()) {
        if field.required && !item.contains_key(&field.name) {
            return Err(DynqError::Validation(format!(
                "required field {:?} missing",
                field.name
            )));
        }
    }

    if !preset.allow_ad_hoc_fields
        && let Some(key) = item.keys().find(|key| preset.field(key).is_none())
    {
        return Err(DynqError::Validation(format!(
            "field {:?} is not allowed for preset {:?}",
            key, preset.id
        )));
    }

    Ok(())
}

/// Validate and build statements for every item
///
/// `default_max_kb` is the installation-wide payload cap; see
/// [`UploadPreset::effective_max_payload_kb`].
pub fn build_upload_plan(
    preset: &UploadPreset,
    default_max_kb: i64,
    items: &[Value],
) -> Result<UploadPlan> {
    if preset.id.is_empty() {
        return Err(DynqError::Validation("preset.id is required".to_string()));
    }
    if preset.table.is_empty() {
        return Err(DynqError::Validation(format!(
            "preset {:?} missing table name",
            preset.id
        )));
    }
    preset.operation.ensure_supported()?;
    if items.is_empty() {
        return Err(DynqError::Validation("at least one item is required".to_string()));
    }

    let max_kb = preset.effective_max_payload_kb(default_max_kb);
    let max_bytes = usize::try_from(max_kb.saturating_mul(1024)).unwrap_or(usize::MAX);

    let mut statements = Vec::with_capacity(items.len());
    let mut total_bytes = 0usize;

    for (index, item) in items.iter().enumerate() {
        let number = index + 1;
        let item = match item {
            Value::Object(map) => map,
            Value::Null => {
                return Err(DynqError::Validation(format!("item {} is empty", number)));
            }
            _ => {
                return Err(DynqError::Validation(format!(
                    "item {} must be a JSON object",
                    number
                )));
            }
        };

        validate_item(preset, item).map_err(|err| err.context(format!("item {}", number)))?;

        let payload = serde_json::to_vec(item).map_err(|err| {
            DynqError::Validation(format!("item {}: failed to marshal payload: {}", number, err))
        })?;
        total_bytes += payload.len();
        if total_bytes > max_bytes {
            return Err(DynqError::Validation(format!(
                "payload exceeds maximum size of {} KB (item {} pushed total to {} KB)",
                max_kb,
                number,
                total_bytes.div_ceil(1024)
            )));
        }

        let built = build_statement_for_item(preset, item)
            .map_err(|err| err.context(format!("item {}", number)))?;
        statements.push(built);
    }

    tracing::debug!(
        preset = %preset.id,
        statements = statements.len(),
        payload_bytes = total_bytes,
        "built upload plan"
    );

    Ok(UploadPlan {
        statements,
        payload_size_bytes: total_bytes,
    })
}
