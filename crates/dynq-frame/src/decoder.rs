//! Decoding of tagged store values into typed cells

use dynq_core::{Cell, DatetimeFormat, DynqError, Result, SourceValue};

/// A parsed numeric attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Parse a store number: integer when it fits in an i64, decimal otherwise
pub fn parse_number(raw: &str) -> Result<Number> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Number::Int(i));
    }
    raw.parse::<f64>()
        .map(Number::Float)
        .map_err(|_| DynqError::Decode(format!("parsing number {:?}: invalid syntax", raw)))
}

/// Decode the first value seen for an attribute
///
/// Returns `Ok(None)` for store nulls; no column is created for them.
pub fn decode(value: &SourceValue, hint: Option<&DatetimeFormat>) -> Result<Option<Cell>> {
    let cell = match value {
        SourceValue::S(text) => match hint {
            Some(format @ DatetimeFormat::Layout(_)) => Cell::Time(format.parse_text(text)?),
            _ => Cell::String(text.clone()),
        },
        SourceValue::N(raw) => match parse_number(raw)? {
            Number::Int(i) => match hint {
                Some(format) => Cell::Time(format.interpret_epoch(i)?),
                None => Cell::Int64(i),
            },
            Number::Float(f) => Cell::Float64(f),
        },
        SourceValue::B(_) | SourceValue::Bs(_) => Cell::String(value.kind().placeholder().to_string()),
        SourceValue::Bool(b) => Cell::Bool(*b),
        SourceValue::Null => return Ok(None),
        SourceValue::M(_) | SourceValue::L(_) | SourceValue::Ss(_) | SourceValue::Ns(_) => {
            Cell::Json(value.to_json()?)
        }
    };
    Ok(Some(cell))
}
