//! Field type coercion from caller JSON to store values

use dynq_core::{DynqError, SourceValue};
use serde_json::Value;
use thiserror::Error;

use crate::preset::UploadField;

/// Errors raised while coercing a single field value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("unsupported field type {0:?}")]
    UnknownType(String),

    #[error("number field cannot be empty string")]
    EmptyNumber,

    #[error("invalid number string: {0:?}")]
    InvalidNumber(String),

    #[error("value {0} cannot be converted to number")]
    NotANumber(String),

    #[error("invalid boolean string {0:?}")]
    InvalidBoolean(String),

    #[error("value {0} cannot be converted to bool")]
    NotABoolean(String),

    #[error("invalid json: {0}")]
    InvalidJson(String),
}

impl From<CoercionError> for DynqError {
    fn from(err: CoercionError) -> Self {
        DynqError::Validation(err.to_string())
    }
}

/// Target kind a field value is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Json,
    /// Natural mapping of the JSON value
    Auto,
}

impl FieldKind {
    /// Resolve a field's kind from its declared type, then its store type hint
    pub fn resolve(field: &UploadField) -> Result<Self, CoercionError> {
        let declared = field.field_type.trim().to_lowercase();
        match declared.as_str() {
            "string" => return Ok(Self::String),
            "number" | "numeric" => return Ok(Self::Number),
            "boolean" | "bool" => return Ok(Self::Boolean),
            "json" | "map" | "object" => return Ok(Self::Json),
            "" | "auto" | "any" => {}
            _ => return Err(CoercionError::UnknownType(field.field_type.clone())),
        }

        let hinted = match field.dynamo_type.trim().to_uppercase().as_str() {
            "N" | "NUMBER" => Self::Number,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "M" | "MAP" | "L" | "LIST" | "SS" | "NS" | "BS" => Self::Json,
            "B" | "BINARY" | "NULL" | "S" | "STRING" => Self::String,
            _ => Self::Auto,
        };
        Ok(hinted)
    }
}

/// Coerce `value` per the field's resolved kind
///
/// JSON `null` always becomes a store NULL.
pub fn coerce_value(field: &UploadField, value: &Value) -> Result<SourceValue, CoercionError> {
    if value.is_null() {
        return Ok(SourceValue::Null);
    }

    match FieldKind::resolve(field)? {
        FieldKind::String => Ok(SourceValue::S(to_text(value))),
        FieldKind::Number => to_number_string(value).map(SourceValue::N),
        FieldKind::Boolean => to_bool(value).map(SourceValue::Bool),
        FieldKind::Json => match value {
            Value::String(text) if text.trim().is_empty() => Ok(SourceValue::Null),
            Value::String(text) => serde_json::from_str::<Value>(text)
                .map(|decoded| marshal_value(&decoded))
                .map_err(|e| CoercionError::InvalidJson(e.to_string())),
            other => Ok(marshal_value(other)),
        },
        FieldKind::Auto => Ok(marshal_value(value)),
    }
}

/// Natural store representation of a JSON value
pub fn marshal_value(value: &Value) -> SourceValue {
    match value {
        Value::Null => SourceValue::Null,
        Value::Bool(b) => SourceValue::Bool(*b),
        Value::Number(n) => SourceValue::N(number_text(n)),
        Value::String(s) => SourceValue::S(s.clone()),
        Value::Array(items) => SourceValue::L(items.iter().map(marshal_value).collect()),
        Value::Object(map) => SourceValue::M(
            map.iter()
                .map(|(key, value)| (key.clone(), marshal_value(value)))
                .collect(),
        ),
    }
}

/// Shortest decimal text for a JSON number
fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
}

/// Six-decimal rendering with trailing zeros and point removed
pub fn trim_trailing_zeros(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => trim_trailing_zeros(n.as_f64().unwrap_or_default()),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn to_number_string(value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => i.to_string(),
            None => trim_trailing_zeros(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) if s.trim().is_empty() => Err(CoercionError::EmptyNumber),
        Value::String(s) => match s.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => Ok(s.clone()),
            _ => Err(CoercionError::InvalidNumber(s.clone())),
        },
        other => Err(CoercionError::NotANumber(other.to_string())),
    }
}

fn to_bool(value: &Value) -> Result<bool, CoercionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(CoercionError::InvalidBoolean(s.clone())),
        },
        other => Err(CoercionError::NotABoolean(other.to_string())),
    }
}
