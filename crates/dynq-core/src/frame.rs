//! Columnar result model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DatetimeFormat;

/// Element type of a column; every column is nullable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int64,
    Float64,
    Bool,
    Time,
    Json,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Time => "time",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// A single non-null decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Cell {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::String(_) => ColumnType::String,
            Self::Int64(_) => ColumnType::Int64,
            Self::Float64(_) => ColumnType::Float64,
            Self::Bool(_) => ColumnType::Bool,
            Self::Time(_) => ColumnType::Time,
            Self::Json(_) => ColumnType::Json,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Typed, nullable buffer backing a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    String(Vec<Option<String>>),
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Time(Vec<Option<DateTime<Utc>>>),
    Json(Vec<Option<serde_json::Value>>),
}

impl ColumnData {
    /// A buffer of `nulls` nulls typed to hold `cell`, followed by `cell`
    pub fn starting_with(cell: Cell, nulls: usize) -> Self {
        fn padded<T>(nulls: usize, value: T) -> Vec<Option<T>> {
            let mut values = Vec::with_capacity(nulls + 1);
            values.resize_with(nulls, || None);
            values.push(Some(value));
            values
        }

        match cell {
            Cell::String(v) => Self::String(padded(nulls, v)),
            Cell::Int64(v) => Self::Int64(padded(nulls, v)),
            Cell::Float64(v) => Self::Float64(padded(nulls, v)),
            Cell::Bool(v) => Self::Bool(padded(nulls, v)),
            Cell::Time(v) => Self::Time(padded(nulls, v)),
            Cell::Json(v) => Self::Json(padded(nulls, v)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::String(_) => ColumnType::String,
            Self::Int64(_) => ColumnType::Int64,
            Self::Float64(_) => ColumnType::Float64,
            Self::Bool(_) => ColumnType::Bool,
            Self::Time(_) => ColumnType::Time,
            Self::Json(_) => ColumnType::Json,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::String(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Time(v) => v.len(),
            Self::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_null(&mut self) {
        match self {
            Self::String(v) => v.push(None),
            Self::Int64(v) => v.push(None),
            Self::Float64(v) => v.push(None),
            Self::Bool(v) => v.push(None),
            Self::Time(v) => v.push(None),
            Self::Json(v) => v.push(None),
        }
    }

    /// Cell at `row`, or `None` when null or out of range
    pub fn cell(&self, row: usize) -> Option<Cell> {
        match self {
            Self::String(v) => v.get(row)?.clone().map(Cell::String),
            Self::Int64(v) => v.get(row)?.map(Cell::Int64),
            Self::Float64(v) => v.get(row)?.map(Cell::Float64),
            Self::Bool(v) => v.get(row)?.map(Cell::Bool),
            Self::Time(v) => v.get(row)?.map(Cell::Time),
            Self::Json(v) => v.get(row)?.clone().map(Cell::Json),
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.cell(row).is_none()
    }
}

/// A named column with its optional datetime interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hint_serde")]
    pub datetime_format: Option<DatetimeFormat>,
    pub data: ColumnData,
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cell(&self, row: usize) -> Option<Cell> {
        self.data.cell(row)
    }
}

mod hint_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::DatetimeFormat;

    pub fn serialize<S: Serializer>(
        value: &Option<DatetimeFormat>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(format) => serializer.serialize_some(format.as_hint()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DatetimeFormat>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(DatetimeFormat::from_hint))
    }
}

/// A structured event raised while materializing a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameDiagnostic {
    /// An integer column was rebuilt as float64 to hold a decimal
    ColumnWidened { column: String, row: usize },
    /// A column was rebuilt as string to hold an incompatible value
    ConvertedToString {
        column: String,
        from: ColumnType,
        row: usize,
    },
    /// A composite value could not be rendered as JSON; a placeholder was stored
    SerializationFallback {
        column: String,
        row: usize,
        placeholder: String,
    },
}

impl FrameDiagnostic {
    pub fn column(&self) -> &str {
        match self {
            Self::ColumnWidened { column, .. }
            | Self::ConvertedToString { column, .. }
            | Self::SerializationFallback { column, .. } => column,
        }
    }
}

impl fmt::Display for FrameDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnWidened { column, row } => {
                write!(f, "column {} widened from int64 to float64 at row {}", column, row)
            }
            Self::ConvertedToString { column, from, row } => {
                write!(f, "column {} converted from {} to string at row {}", column, from, row)
            }
            Self::SerializationFallback {
                column,
                row,
                placeholder,
            } => write!(
                f,
                "column {} stored placeholder {} at row {}",
                column, placeholder, row
            ),
        }
    }
}

/// A rectangular table of typed columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub columns: Vec<Column>,
    /// Number of source items, including items with no non-null attribute
    #[serde(default)]
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<FrameDiagnostic>,
}

impl Frame {
    /// An empty frame with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
