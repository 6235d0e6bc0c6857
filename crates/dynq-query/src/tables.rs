//! Table metadata helpers: listing, attribute discovery, health

use std::fmt;

use dynq_core::{ListTablesRequest, Result, StatementRequest, StoreTransport};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::planner::quote_identifier;

const LIST_TABLES_PAGE_SIZE: u32 = 100;
const ATTRIBUTE_SAMPLE_SIZE: u64 = 5;

/// List every table name, following continuation pages
pub async fn list_all_tables(transport: &dyn StoreTransport) -> Result<Vec<String>> {
    let mut tables = Vec::new();
    let mut start: Option<String> = None;

    loop {
        let page = transport
            .list_tables(ListTablesRequest {
                exclusive_start_table_name: start.take(),
                limit: Some(LIST_TABLES_PAGE_SIZE),
            })
            .await?;

        tables.extend(page.table_names);

        match page.last_evaluated_table_name {
            Some(last) => start = Some(last),
            None => break,
        }
    }

    tracing::debug!(count = tables.len(), "listed tables");
    Ok(tables)
}

/// Attribute names known for a table
///
/// Key schema attributes come first, then declared attribute definitions,
/// then any attribute seen in a small sample of items. A failed sample
/// still returns the schema-derived names.
pub async fn discover_table_attributes(
    transport: &dyn StoreTransport,
    table: &str,
) -> Result<Vec<String>> {
    let description = transport.describe_table(table).await?;

    let mut names: IndexSet<String> = IndexSet::new();
    for element in &description.key_schema {
        names.insert(element.attribute_name.clone());
    }
    for definition in &description.attribute_definitions {
        names.insert(definition.attribute_name.clone());
    }

    let sample = StatementRequest::new(format!("SELECT * FROM {}", quote_identifier(table)))
        .with_limit(Some(ATTRIBUTE_SAMPLE_SIZE));
    match transport.execute_statement(sample).await {
        Ok(page) => {
            for item in page.items {
                names.extend(item.into_keys());
            }
        }
        Err(err) => {
            tracing::debug!(table, error = %err, "attribute sample failed");
        }
    }

    Ok(names.into_iter().collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheckResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Verify connectivity by describing the connection-test table
pub async fn check_health(transport: &dyn StoreTransport, test_table: &str) -> HealthCheckResult {
    if test_table.trim().is_empty() {
        return HealthCheckResult::error("connection test table is not configured");
    }

    match transport.describe_table(test_table).await {
        Ok(_) => HealthCheckResult::ok("Successfully connects to DynamoDB"),
        Err(err) => {
            tracing::warn!(table = test_table, error = %err, "health check failed");
            HealthCheckResult::error(err.to_string())
        }
    }
}
