//! Table and index key metadata

use serde::{Deserialize, Serialize};

use crate::error::{DynqError, Result};

/// Role of an attribute in a key schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "HASH")]
    Hash,
    #[serde(rename = "RANGE")]
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

impl KeySchemaElement {
    pub fn hash(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Hash,
        }
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: String,
}

/// A global or local secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDescription {
    pub index_name: String,
    #[serde(default)]
    pub key_schema: Vec<KeySchemaElement>,
}

/// Result of describing a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescription {
    pub table_name: String,
    #[serde(default)]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(default)]
    pub attribute_definitions: Vec<AttributeDefinition>,
    #[serde(default)]
    pub global_secondary_indexes: Vec<IndexDescription>,
    #[serde(default)]
    pub local_secondary_indexes: Vec<IndexDescription>,
}

impl TableDescription {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, element: KeySchemaElement) -> Self {
        self.key_schema.push(element);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        self.attribute_definitions.push(AttributeDefinition {
            attribute_name: name.into(),
            attribute_type: attribute_type.into(),
        });
        self
    }

    pub fn with_global_index(mut self, index: IndexDescription) -> Self {
        self.global_secondary_indexes.push(index);
        self
    }

    pub fn with_local_index(mut self, index: IndexDescription) -> Self {
        self.local_secondary_indexes.push(index);
        self
    }

    /// Resolve the key schema of the table or one of its indexes
    ///
    /// Index names match case-insensitively, global indexes first.
    pub fn key_schema_for(&self, index: Option<&str>) -> Result<KeySchema> {
        let Some(index) = index.filter(|name| !name.is_empty()) else {
            return Ok(KeySchema::from_elements(&self.key_schema));
        };

        self.global_secondary_indexes
            .iter()
            .chain(self.local_secondary_indexes.iter())
            .find(|candidate| candidate.index_name.eq_ignore_ascii_case(index))
            .map(|found| KeySchema::from_elements(&found.key_schema))
            .ok_or_else(|| {
                tracing::debug!(
                    table = %self.table_name,
                    index,
                    global = self.global_secondary_indexes.len(),
                    local = self.local_secondary_indexes.len(),
                    "index not found in table description"
                );
                DynqError::NotFound(format!(
                    "index {} not found on table {}",
                    index, self.table_name
                ))
            })
    }
}

impl IndexDescription {
    pub fn new(index_name: impl Into<String>, key_schema: Vec<KeySchemaElement>) -> Self {
        Self {
            index_name: index_name.into(),
            key_schema,
        }
    }
}

/// Partition and sort key names of a table or index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: Option<String>,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn from_elements(elements: &[KeySchemaElement]) -> Self {
        let mut schema = Self::default();
        for element in elements {
            match element.key_type {
                KeyType::Hash => schema.partition_key = Some(element.attribute_name.clone()),
                KeyType::Range => schema.sort_key = Some(element.attribute_name.clone()),
            }
        }
        schema
    }
}
