//! Upload presets: declarative write targets with a field schema

use std::fmt;

use dynq_core::{DynqError, Result};
use serde::{Deserialize, Serialize};

/// Payload cap used when neither the preset nor the installation sets one
pub const FALLBACK_MAX_PAYLOAD_KB: i64 = 512;

/// Kind of statement a preset issues per item
///
/// Unrecognized values, including an omitted operation, deserialize as
/// [`UploadOperation::Unsupported`] and are rejected when the preset is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UploadOperation {
    Insert,
    Update,
    Delete,
    Select,
    Unsupported(String),
}

impl UploadOperation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Select => "select",
            Self::Unsupported(raw) => raw,
        }
    }

    /// Reject operations no statement can be built for
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            Self::Unsupported(raw) => Err(unsupported_operation(raw)),
            _ => Ok(()),
        }
    }
}

pub(crate) fn unsupported_operation(raw: &str) -> DynqError {
    DynqError::Validation(format!("operation {:?} not supported", raw))
}

impl Default for UploadOperation {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

impl From<String> for UploadOperation {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "insert" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "select" => Self::Select,
            _ => Self::Unsupported(raw),
        }
    }
}

impl From<UploadOperation> for String {
    fn from(operation: UploadOperation) -> Self {
        operation.as_str().to_string()
    }
}

impl fmt::Display for UploadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a preset schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadField {
    pub name: String,
    /// Declared type: `string`, `number`, `boolean`, `json`, or `auto`
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,
    /// Store-native type hint (`S`, `N`, `BOOL`, `M`, ...) used when the
    /// declared type is `auto`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dynamo_type: String,
}

impl UploadField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_dynamo_type(mut self, dynamo_type: impl Into<String>) -> Self {
        self.dynamo_type = dynamo_type.into();
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A named, preconfigured upload target
///
/// Presets are read-only at use time; derived adjustments such as the
/// effective payload cap are made on clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadPreset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
    #[serde(default)]
    pub operation: UploadOperation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema: Vec<UploadField>,
    #[serde(rename = "partiqlTemplate", default, skip_serializing_if = "String::is_empty")]
    pub partiql_template: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_ad_hoc_fields: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_dry_run: bool,
    #[serde(rename = "maxPayloadKB", default, skip_serializing_if = "is_zero")]
    pub max_payload_kb: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub response_preview: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl UploadPreset {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        operation: UploadOperation,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            table: table.into(),
            operation,
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: UploadField) -> Self {
        self.schema.push(field);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.partiql_template = template.into();
        self
    }

    pub fn with_ad_hoc_fields(mut self) -> Self {
        self.allow_ad_hoc_fields = true;
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.allow_dry_run = true;
        self
    }

    pub fn with_max_payload_kb(mut self, max_payload_kb: i64) -> Self {
        self.max_payload_kb = max_payload_kb;
        self
    }

    /// The statement template, if one is configured
    pub fn template(&self) -> Option<&str> {
        let template = self.partiql_template.trim();
        (!template.is_empty()).then_some(self.partiql_template.as_str())
    }

    /// Look up a schema field by name
    pub fn field(&self, name: &str) -> Option<&UploadField> {
        self.schema.iter().find(|field| field.name == name)
    }

    /// Payload cap in KB given the installation-wide default
    ///
    /// The preset's own cap wins when set, otherwise the default, otherwise
    /// [`FALLBACK_MAX_PAYLOAD_KB`]. A positive default also clamps the result.
    pub fn effective_max_payload_kb(&self, default_max_kb: i64) -> i64 {
        let mut max = self.max_payload_kb;
        if max <= 0 && default_max_kb > 0 {
            max = default_max_kb;
        }
        if max <= 0 {
            max = FALLBACK_MAX_PAYLOAD_KB;
        }
        if default_max_kb > 0 && max > default_max_kb {
            return default_max_kb;
        }
        max
    }

    /// Check the fields a stored preset must carry
    pub fn validate_for_save(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(DynqError::Validation("preset ID is required".to_string()));
        }
        if self.name.is_empty() {
            return Err(DynqError::Validation("preset name is required".to_string()));
        }
        if self.table.is_empty() {
            return Err(DynqError::Validation("table name is required".to_string()));
        }
        Ok(())
    }

    pub fn summarize(&self) -> UploadPresetSummary {
        UploadPresetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            table: self.table.clone(),
            index: self.index.clone(),
            operation: self.operation.clone(),
            schema: self.schema.clone(),
            allow_ad_hoc_fields: self.allow_ad_hoc_fields,
            allow_dry_run: self.allow_dry_run,
            max_payload_kb: self.max_payload_kb,
            partiql_template: self.partiql_template.clone(),
            response_preview: self.response_preview,
            help_text: self.help_text.clone(),
            category: self.category.clone(),
        }
    }
}

/// Host-facing view of a preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadPresetSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
    pub operation: UploadOperation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema: Vec<UploadField>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_ad_hoc_fields: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_dry_run: bool,
    #[serde(rename = "maxPayloadKB", default, skip_serializing_if = "is_zero")]
    pub max_payload_kb: i64,
    #[serde(rename = "partiqlTemplate", default, skip_serializing_if = "String::is_empty")]
    pub partiql_template: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub response_preview: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}
