//! Per-attribute column accumulator

use chrono::SecondsFormat;
use dynq_core::{
    Column, ColumnData, ColumnType, DatetimeFormat, DynqError, FrameDiagnostic, Result,
    SourceValue,
};

use crate::decoder::{Number, decode, parse_number};

/// Accumulates one attribute's values across rows into a typed column
///
/// The buffer type is fixed by the first non-null value and adapted in
/// place when later values disagree. Adaptations are recorded as
/// [`FrameDiagnostic`]s and drained by the frame builder.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    format: Option<DatetimeFormat>,
    data: ColumnData,
    diagnostics: Vec<FrameDiagnostic>,
}

impl Attribute {
    /// Start a column at `row_index`, padded with that many leading nulls
    ///
    /// Returns `Ok(None)` when the value is a store null.
    pub fn new(
        row_index: usize,
        name: impl Into<String>,
        value: &SourceValue,
        format: Option<DatetimeFormat>,
    ) -> Result<Option<Self>> {
        let Some(cell) = decode(value, format.as_ref())? else {
            return Ok(None);
        };

        Ok(Some(Self {
            name: name.into(),
            format,
            data: ColumnData::starting_with(cell, row_index),
            diagnostics: Vec::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Append one null
    pub fn pad(&mut self) {
        self.data.push_null();
    }

    pub fn diagnostics(&self) -> &[FrameDiagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<FrameDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_column(self) -> Column {
        Column {
            name: self.name,
            datetime_format: self.format,
            data: self.data,
        }
    }

    /// Append a value from a later row
    pub fn append(&mut self, value: &SourceValue) -> Result<()> {
        let row = self.size();

        match value {
            SourceValue::S(text) => self.append_string(text, row)?,
            SourceValue::N(raw) => match parse_number(raw)? {
                Number::Int(i) => self.append_int(i, row)?,
                Number::Float(f) => self.append_float(f, row),
            },
            SourceValue::B(_) | SourceValue::Bs(_) => {
                self.push_text(row, value.kind().placeholder().to_string());
            }
            SourceValue::Bool(b) => match &mut self.data {
                ColumnData::Bool(values) => values.push(Some(*b)),
                _ => self.push_text(row, b.to_string()),
            },
            SourceValue::Null => self.data.push_null(),
            SourceValue::M(_) | SourceValue::L(_) | SourceValue::Ss(_) | SourceValue::Ns(_) => {
                self.append_composite(value, row)
            }
        }

        Ok(())
    }

    fn append_string(&mut self, text: &str, row: usize) -> Result<()> {
        if let (Some(format @ DatetimeFormat::Layout(_)), ColumnData::Time(values)) =
            (&self.format, &mut self.data)
        {
            values.push(Some(format.parse_text(text)?));
            return Ok(());
        }

        self.push_text(row, text.to_string());
        Ok(())
    }

    fn append_int(&mut self, value: i64, row: usize) -> Result<()> {
        match &self.format {
            Some(DatetimeFormat::Layout(_)) => {
                return Err(DynqError::Decode("invalid datetime format".to_string()));
            }
            Some(format) => {
                let format = format.clone();
                match &mut self.data {
                    ColumnData::Time(values) => values.push(Some(format.interpret_epoch(value)?)),
                    _ => self.push_text(row, value.to_string()),
                }
            }
            None => match &mut self.data {
                ColumnData::Int64(values) => values.push(Some(value)),
                ColumnData::Float64(values) => values.push(Some(value as f64)),
                _ => self.push_text(row, value.to_string()),
            },
        }
        Ok(())
    }

    fn append_float(&mut self, value: f64, row: usize) {
        match &mut self.data {
            ColumnData::Float64(values) => values.push(Some(value)),
            ColumnData::Int64(values) => {
                let mut widened: Vec<Option<f64>> =
                    values.iter().map(|v| v.map(|i| i as f64)).collect();
                widened.push(Some(value));
                self.data = ColumnData::Float64(widened);

                tracing::debug!(field = %self.name, row, "widening int64 column to float64");
                self.diagnostics.push(FrameDiagnostic::ColumnWidened {
                    column: self.name.clone(),
                    row,
                });
            }
            _ => self.push_text(row, format_float(value)),
        }
    }

    fn append_composite(&mut self, value: &SourceValue, row: usize) {
        match value.to_json() {
            Ok(json) => match &mut self.data {
                ColumnData::Json(values) => values.push(Some(json)),
                _ => self.push_text(row, json.to_string()),
            },
            Err(err) => {
                let placeholder = value.kind().placeholder();
                tracing::warn!(
                    field = %self.name,
                    row,
                    error = %err,
                    "JSON conversion failed, storing placeholder"
                );
                self.diagnostics.push(FrameDiagnostic::SerializationFallback {
                    column: self.name.clone(),
                    row,
                    placeholder: placeholder.to_string(),
                });

                match &mut self.data {
                    ColumnData::Json(values) => {
                        values.push(Some(serde_json::Value::String(placeholder.to_string())))
                    }
                    _ => self.push_text(row, placeholder.to_string()),
                }
            }
        }
    }

    /// Append text, rebuilding the column as string first if needed
    fn push_text(&mut self, row: usize, text: String) {
        let mut values = match std::mem::replace(&mut self.data, ColumnData::String(Vec::new())) {
            ColumnData::String(values) => values,
            other => {
                let from = other.column_type();
                tracing::warn!(
                    field = %self.name,
                    expected = %from,
                    row,
                    "type mismatch, converting field to string"
                );
                self.diagnostics.push(FrameDiagnostic::ConvertedToString {
                    column: self.name.clone(),
                    from,
                    row,
                });
                to_string_values(other)
            }
        };
        values.push(Some(text));
        self.data = ColumnData::String(values);
    }
}

/// Render an existing buffer as text, keeping nulls in place
fn to_string_values(data: ColumnData) -> Vec<Option<String>> {
    match data {
        ColumnData::String(values) => values,
        ColumnData::Int64(values) => values
            .into_iter()
            .map(|v| v.map(|i| i.to_string()))
            .collect(),
        ColumnData::Float64(values) => values
            .into_iter()
            .map(|v| v.map(format_float))
            .collect(),
        ColumnData::Bool(values) => values
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        ColumnData::Time(values) => values
            .into_iter()
            .map(|v| v.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .collect(),
        ColumnData::Json(values) => values
            .into_iter()
            .map(|v| v.map(|json| json.to_string()))
            .collect(),
    }
}

/// Shortest decimal text that round-trips, without exponent notation
pub(crate) fn format_float(value: f64) -> String {
    value.to_string()
}
