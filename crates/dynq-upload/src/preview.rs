//! Human-readable statement previews

use dynq_core::SourceValue;
use serde_json::Value;

use crate::coercion::trim_trailing_zeros;
use crate::statement::quote_attribute;

const PREVIEW_MAX_CHARS: usize = 50;
const PREVIEW_KEEP_CHARS: usize = 47;

fn truncate(text: String) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        return text;
    }
    let mut kept: String = text.chars().take(PREVIEW_KEEP_CHARS).collect();
    kept.push_str("...");
    kept
}

/// Render a caller value as a preview literal
///
/// Strings are single-quoted with `'` escaped as `\'`; long strings and
/// composite values are cut to 50 characters.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("'{}'", truncate(s.replace('\'', "\\'"))),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => trim_trailing_zeros(n.as_f64().unwrap_or_default()),
        },
        composite => truncate(composite.to_string()),
    }
}

/// Render an already-coerced parameter as a preview literal
pub fn format_parameter(value: &SourceValue) -> String {
    match value {
        SourceValue::S(s) => format!("'{}'", truncate(s.replace('\'', "\\'"))),
        SourceValue::N(n) => n.clone(),
        SourceValue::Bool(b) => b.to_string(),
        SourceValue::Null => "null".to_string(),
        other => match other.to_json() {
            Ok(json) => truncate(json.to_string()),
            Err(_) => other.kind().placeholder().to_string(),
        },
    }
}

/// `'key'=value` pairs for the given keys
pub fn assignments<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    item: &serde_json::Map<String, Value>,
) -> Vec<String> {
    keys.into_iter()
        .map(|key| {
            let value = item.get(key).unwrap_or(&Value::Null);
            format!("{}={}", quote_attribute(key), format_value(value))
        })
        .collect()
}

/// Byte offsets of `?` placeholders outside single- or double-quoted literals
pub fn placeholder_positions(template: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;

    for (offset, ch) in template.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '?') => positions.push(offset),
            (None, _) => {}
        }
    }

    positions
}

/// Substitute each placeholder with the preview of its parameter
pub fn render_template(template: &str, parameters: &[SourceValue]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for (position, parameter) in placeholder_positions(template).into_iter().zip(parameters) {
        rendered.push_str(&template[last..position]);
        rendered.push_str(&format_parameter(parameter));
        last = position + 1;
    }
    rendered.push_str(&template[last..]);
    rendered
}
