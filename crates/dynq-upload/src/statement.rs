//! Per-item PartiQL write statements

use dynq_core::{DynqError, Result, SourceValue};
use serde_json::{Map, Value};

use crate::coercion::{coerce_value, marshal_value};
use crate::preset::{UploadOperation, UploadPreset, unsupported_operation};
use crate::preview;

/// A parameterized statement with its display preview
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub statement: String,
    pub parameters: Vec<SourceValue>,
    pub preview: String,
}

fn quote_table(table: &str) -> String {
    format!("\"{}\"", table.replace('"', "\"\""))
}

/// Single-quote an attribute name, doubling embedded quotes
pub(crate) fn quote_attribute(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn sorted_keys(item: &Map<String, Value>) -> Vec<&str> {
    let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// `'name'=?` for each key
fn predicates(keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|key| format!("{}=?", quote_attribute(key)))
        .collect()
}

fn marshal_fields(keys: &[&str], item: &Map<String, Value>) -> Vec<SourceValue> {
    keys.iter()
        .map(|key| marshal_value(item.get(*key).unwrap_or(&Value::Null)))
        .collect()
}

/// Build the statement one item produces under `preset`
pub fn build_statement_for_item(
    preset: &UploadPreset,
    item: &Map<String, Value>,
) -> Result<BuiltStatement> {
    match &preset.operation {
        UploadOperation::Insert => build_insert(preset, item),
        UploadOperation::Update => match preset.template() {
            Some(template) => build_templated(preset, template, item),
            None => build_update(preset, item),
        },
        UploadOperation::Delete => match preset.template() {
            Some(template) => build_templated(preset, template, item),
            None => build_delete(preset, item),
        },
        UploadOperation::Select => match preset.template() {
            Some(template) => build_templated(preset, template, item),
            None => build_select(preset, item),
        },
        UploadOperation::Unsupported(raw) => Err(unsupported_operation(raw)),
    }
}

fn build_insert(preset: &UploadPreset, item: &Map<String, Value>) -> Result<BuiltStatement> {
    if item.is_empty() {
        return Err(DynqError::Validation("payload is empty".to_string()));
    }

    let keys = sorted_keys(item);
    let placeholders: Vec<String> = keys
        .iter()
        .map(|key| format!("{}: ?", quote_attribute(key)))
        .collect();
    let values: Vec<String> = keys
        .iter()
        .map(|key| {
            format!(
                "{}: {}",
                quote_attribute(key),
                preview::format_value(&item[*key])
            )
        })
        .collect();

    let table = quote_table(&preset.table);
    Ok(BuiltStatement {
        statement: format!("INSERT INTO {} VALUE {{{}}}", table, placeholders.join(", ")),
        parameters: marshal_fields(&keys, item),
        preview: format!("INSERT INTO {} VALUE {{{}}}", table, values.join(", ")),
    })
}

/// Key fields are schema fields that are required or named `PK`/`SK`
fn is_key_field(preset: &UploadPreset, name: &str) -> bool {
    preset
        .field(name)
        .is_some_and(|field| field.required || name == "PK" || name == "SK")
}

fn build_update(preset: &UploadPreset, item: &Map<String, Value>) -> Result<BuiltStatement> {
    if item.is_empty() {
        return Err(DynqError::Validation("payload is empty".to_string()));
    }

    let (key_fields, update_fields): (Vec<&str>, Vec<&str>) = sorted_keys(item)
        .into_iter()
        .partition(|name| is_key_field(preset, name));

    if key_fields.is_empty() {
        return Err(DynqError::Validation(
            "no key fields found for UPDATE (PK/SK required)".to_string(),
        ));
    }
    if update_fields.is_empty() {
        return Err(DynqError::Validation("no fields to update".to_string()));
    }

    let set_clause = predicates(&update_fields);
    let where_clause = predicates(&key_fields);

    let mut parameters = marshal_fields(&update_fields, item);
    parameters.extend(marshal_fields(&key_fields, item));

    let table = quote_table(&preset.table);
    Ok(BuiltStatement {
        statement: format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            set_clause.join(", "),
            where_clause.join(" AND ")
        ),
        parameters,
        preview: format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            preview::assignments(update_fields.iter().copied(), item).join(", "),
            preview::assignments(key_fields.iter().copied(), item).join(" AND ")
        ),
    })
}

fn build_delete(preset: &UploadPreset, item: &Map<String, Value>) -> Result<BuiltStatement> {
    if item.is_empty() {
        return Err(DynqError::Validation("payload is empty".to_string()));
    }

    let keys = sorted_keys(item);
    let where_clause = predicates(&keys);

    let table = quote_table(&preset.table);
    Ok(BuiltStatement {
        statement: format!("DELETE FROM {} WHERE {}", table, where_clause.join(" AND ")),
        parameters: marshal_fields(&keys, item),
        preview: format!(
            "DELETE FROM {} WHERE {}",
            table,
            preview::assignments(keys.iter().copied(), item).join(" AND ")
        ),
    })
}

fn build_select(preset: &UploadPreset, item: &Map<String, Value>) -> Result<BuiltStatement> {
    let keys = sorted_keys(item);
    let table = quote_table(&preset.table);

    if keys.is_empty() {
        let statement = format!("SELECT * FROM {}", table);
        return Ok(BuiltStatement {
            preview: statement.clone(),
            statement,
            parameters: Vec::new(),
        });
    }

    let where_clause = predicates(&keys);
    Ok(BuiltStatement {
        statement: format!("SELECT * FROM {} WHERE {}", table, where_clause.join(" AND ")),
        parameters: marshal_fields(&keys, item),
        preview: format!(
            "SELECT * FROM {} WHERE {}",
            table,
            preview::assignments(keys.iter().copied(), item).join(" AND ")
        ),
    })
}

/// Bind schema fields, in schema order, to the preset's template
fn build_templated(
    preset: &UploadPreset,
    template: &str,
    item: &Map<String, Value>,
) -> Result<BuiltStatement> {
    if preset.schema.is_empty() {
        return Err(DynqError::Validation(
            "schema definition is required to build statement parameters".to_string(),
        ));
    }

    let mut parameters = Vec::with_capacity(preset.schema.len());
    for field in &preset.schema {
        let Some(value) = item.get(&field.name) else {
            if field.required {
                return Err(DynqError::Validation(format!(
                    "required field {:?} missing",
                    field.name
                )));
            }
            parameters.push(SourceValue::Null);
            continue;
        };

        let coerced = coerce_value(field, value)
            .map_err(|err| DynqError::from(err).context(format!("field {:?}", field.name)))?;
        parameters.push(coerced);
    }

    let placeholders = preview::placeholder_positions(template).len();
    if placeholders > 0 && placeholders != parameters.len() {
        return Err(DynqError::Validation(format!(
            "partiqlTemplate expects {} parameters but schema supplied {}",
            placeholders,
            parameters.len()
        )));
    }

    Ok(BuiltStatement {
        statement: template.to_string(),
        preview: preview::render_template(template, &parameters),
        parameters,
    })
}
