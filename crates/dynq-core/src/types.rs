//! Common types used throughout DYNQ

use std::collections::HashMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DynqError, Result};

/// One item returned by the store, keyed by attribute name in wire order
pub type SourceRow = IndexMap<String, SourceValue>;

/// A tagged attribute value as the store returns it
///
/// Numbers stay in their textual form until something needs to interpret
/// them. Serializes to and from the store's wire JSON, e.g. `{"S": "abc"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireValue", into = "WireValue")]
pub enum SourceValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    M(IndexMap<String, SourceValue>),
    L(Vec<SourceValue>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
}

/// Wire type descriptor of a [`SourceValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    S,
    N,
    B,
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "NULL")]
    Null,
    M,
    L,
    #[serde(rename = "SS")]
    Ss,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "BS")]
    Bs,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::M => "M",
            Self::L => "L",
            Self::Ss => "SS",
            Self::Ns => "NS",
            Self::Bs => "BS",
        }
    }

    /// Text stored in a cell when a value of this kind cannot be rendered
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::S => "[S]",
            Self::N => "[N]",
            Self::B => "[B]",
            Self::Bool => "[BOOL]",
            Self::Null => "[NULL]",
            Self::M => "[M]",
            Self::L => "[L]",
            Self::Ss => "[SS]",
            Self::Ns => "[NS]",
            Self::Bs => "[BS]",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SourceValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::S(_) => ValueKind::S,
            Self::N(_) => ValueKind::N,
            Self::B(_) => ValueKind::B,
            Self::Bool(_) => ValueKind::Bool,
            Self::Null => ValueKind::Null,
            Self::M(_) => ValueKind::M,
            Self::L(_) => ValueKind::L,
            Self::Ss(_) => ValueKind::Ss,
            Self::Ns(_) => ValueKind::Ns,
            Self::Bs(_) => ValueKind::Bs,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a generic JSON value
    ///
    /// Numbers become JSON numbers (integers when they fit in an i64) and
    /// binary data becomes base64 text. Fails on numbers that are not valid
    /// or not representable in JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value;

        Ok(match self {
            Self::S(s) => Value::String(s.clone()),
            Self::N(n) => number_to_json(n)?,
            Self::B(bytes) => Value::String(BASE64.encode(bytes)),
            Self::Bool(b) => Value::Bool(*b),
            Self::Null => Value::Null,
            Self::M(map) => {
                let mut obj = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    obj.insert(key.clone(), value.to_json()?);
                }
                Value::Object(obj)
            }
            Self::L(list) => Value::Array(
                list.iter()
                    .map(SourceValue::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Ss(list) => Value::Array(list.iter().cloned().map(Value::String).collect()),
            Self::Ns(list) => Value::Array(
                list.iter()
                    .map(|n| number_to_json(n))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Bs(list) => Value::Array(
                list.iter()
                    .map(|bytes| Value::String(BASE64.encode(bytes)))
                    .collect(),
            ),
        })
    }

    /// Marshal a generic JSON value into a store value
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::N(n.to_string()),
            Value::String(s) => Self::S(s.clone()),
            Value::Array(items) => Self::L(items.iter().map(Self::from_json).collect()),
            Value::Object(obj) => Self::M(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Decode a store row into a generic JSON object
pub fn row_to_json(row: &SourceRow) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut obj = serde_json::Map::with_capacity(row.len());
    for (name, value) in row {
        obj.insert(name.clone(), value.to_json()?);
    }
    Ok(obj)
}

fn number_to_json(text: &str) -> Result<serde_json::Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(serde_json::Value::from(i));
    }
    let f = text
        .parse::<f64>()
        .map_err(|_| DynqError::Decode(format!("invalid number {:?}", text)))?;
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .ok_or_else(|| DynqError::Decode(format!("number {:?} is not representable in JSON", text)))
}

#[derive(Serialize, Deserialize)]
enum WireValue {
    S(String),
    N(String),
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    M(IndexMap<String, SourceValue>),
    L(Vec<SourceValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
}

impl TryFrom<WireValue> for SourceValue {
    type Error = String;

    fn try_from(wire: WireValue) -> std::result::Result<Self, Self::Error> {
        let decode = |text: &str| {
            BASE64
                .decode(text)
                .map_err(|e| format!("invalid base64 binary value: {}", e))
        };

        Ok(match wire {
            WireValue::S(s) => Self::S(s),
            WireValue::N(n) => Self::N(n),
            WireValue::B(b) => Self::B(decode(&b)?),
            WireValue::Bool(b) => Self::Bool(b),
            WireValue::Null(_) => Self::Null,
            WireValue::M(m) => Self::M(m),
            WireValue::L(l) => Self::L(l),
            WireValue::Ss(ss) => Self::Ss(ss),
            WireValue::Ns(ns) => Self::Ns(ns),
            WireValue::Bs(bs) => Self::Bs(
                bs.iter()
                    .map(|b| decode(b))
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            ),
        })
    }
}

impl From<SourceValue> for WireValue {
    fn from(value: SourceValue) -> Self {
        match value {
            SourceValue::S(s) => Self::S(s),
            SourceValue::N(n) => Self::N(n),
            SourceValue::B(b) => Self::B(BASE64.encode(b)),
            SourceValue::Bool(b) => Self::Bool(b),
            SourceValue::Null => Self::Null(true),
            SourceValue::M(m) => Self::M(m),
            SourceValue::L(l) => Self::L(l),
            SourceValue::Ss(ss) => Self::Ss(ss),
            SourceValue::Ns(ns) => Self::Ns(ns),
            SourceValue::Bs(bs) => Self::Bs(bs.iter().map(|b| BASE64.encode(b)).collect()),
        }
    }
}

/// How a datetime-hinted attribute is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatetimeFormat {
    /// Integer seconds since the Unix epoch
    UnixSeconds,
    /// Integer milliseconds since the Unix epoch
    UnixMillis,
    /// A chrono strftime layout, or the `RFC3339` / `RFC3339Nano` aliases
    Layout(String),
}

impl DatetimeFormat {
    pub const UNIX_SECONDS_HINT: &'static str = "1";
    pub const UNIX_MILLIS_HINT: &'static str = "2";

    /// Interpret a hint string; empty hints mean "no hint"
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "" => None,
            Self::UNIX_SECONDS_HINT => Some(Self::UnixSeconds),
            Self::UNIX_MILLIS_HINT => Some(Self::UnixMillis),
            layout => Some(Self::Layout(layout.to_string())),
        }
    }

    pub fn as_hint(&self) -> &str {
        match self {
            Self::UnixSeconds => Self::UNIX_SECONDS_HINT,
            Self::UnixMillis => Self::UNIX_MILLIS_HINT,
            Self::Layout(layout) => layout,
        }
    }

    pub fn is_unix(&self) -> bool {
        matches!(self, Self::UnixSeconds | Self::UnixMillis)
    }

    pub fn layout(&self) -> Option<&str> {
        match self {
            Self::Layout(layout) => Some(layout),
            _ => None,
        }
    }

    /// Parse text with this format's layout. Unix formats reject text input.
    pub fn parse_text(&self, text: &str) -> Result<DateTime<Utc>> {
        match self {
            Self::Layout(layout) => parse_with_layout(layout, text),
            _ => Err(DynqError::Decode(format!(
                "cannot parse {:?} with unix timestamp format",
                text
            ))),
        }
    }

    /// Interpret an integer per the unix sentinel formats
    pub fn interpret_epoch(&self, value: i64) -> Result<DateTime<Utc>> {
        let parsed = match self {
            Self::UnixSeconds => DateTime::from_timestamp(value, 0),
            Self::UnixMillis => {
                let nanos = (value % 1000) * 1_000_000;
                // Negative remainders carry into the previous second
                let (secs, nanos) = if nanos < 0 {
                    (value / 1000 - 1, nanos + 1_000_000_000)
                } else {
                    (value / 1000, nanos)
                };
                DateTime::from_timestamp(secs, nanos as u32)
            }
            Self::Layout(_) => {
                return Err(DynqError::Decode("invalid datetime format".to_string()));
            }
        };
        parsed.ok_or_else(|| DynqError::Decode(format!("timestamp {} is out of range", value)))
    }
}

fn parse_with_layout(layout: &str, text: &str) -> Result<DateTime<Utc>> {
    match layout {
        "RFC3339" | "RFC3339Nano" => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Ok(dt.with_timezone(&Utc));
            }
        }
        _ => {
            if let Ok(dt) = DateTime::parse_from_str(text, layout) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
                return Ok(naive.and_utc());
            }
            if let Some(naive) = NaiveDate::parse_from_str(text, layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
            {
                return Ok(naive.and_utc());
            }
        }
    }

    Err(DynqError::Decode(format!(
        "parsing time {:?} as {:?}: value does not match layout",
        text, layout
    )))
}

impl fmt::Display for DatetimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_hint())
    }
}

/// An attribute the caller wants interpreted as a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatetimeAttribute {
    pub name: String,
    #[serde(default)]
    pub format: String,
}

/// Client-side sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Direction implied by a native scan-direction flag
    pub fn from_scan_forward(forward: bool) -> Self {
        if forward { Self::Asc } else { Self::Desc }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, Self::Desc)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Only the exact "desc" flips the direction
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        })
    }
}

/// A single query request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// PartiQL statement text
    #[serde(rename = "queryText", default)]
    pub statement: String,
    /// Maximum number of rows to return; non-positive values mean unbounded
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: Option<u64>,
    #[serde(default)]
    pub datetime_attributes: Vec<DatetimeAttribute>,
    #[serde(default)]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub scan_index_forward: Option<bool>,
}

fn deserialize_limit<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.filter(|n| *n > 0).map(|n| n as u64))
}

impl QuerySpec {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Default::default()
        }
    }

    /// Parse a query model from the host's JSON payload
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| DynqError::Validation(format!("json unmarshal: {}", e)))
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn with_sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = Some(field.into());
        self.sort_direction = direction;
        self
    }

    pub fn with_sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn with_scan_index_forward(mut self, forward: bool) -> Self {
        self.scan_index_forward = Some(forward);
        self
    }

    pub fn with_datetime_attribute(
        mut self,
        name: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        self.datetime_attributes.push(DatetimeAttribute {
            name: name.into(),
            format: format.into(),
        });
        self
    }

    /// Caller-supplied sort key, trimmed; `None` when blank
    pub fn requested_sort_key(&self) -> Option<&str> {
        self.sort_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Explicit client-side sort field; `None` when blank
    pub fn explicit_sort_field(&self) -> Option<&str> {
        self.sort_by.as_deref().filter(|field| !field.is_empty())
    }

    /// Datetime hints by attribute name. Later entries override earlier ones.
    pub fn datetime_hints(&self) -> HashMap<String, DatetimeFormat> {
        let mut hints = HashMap::with_capacity(self.datetime_attributes.len());
        for attr in &self.datetime_attributes {
            match DatetimeFormat::from_hint(&attr.format) {
                Some(format) => {
                    hints.insert(attr.name.clone(), format);
                }
                None => {
                    hints.remove(&attr.name);
                }
            }
        }
        hints
    }
}
