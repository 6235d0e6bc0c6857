//! Remote store transport abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::TableDescription;
use crate::types::{SourceRow, SourceValue};

/// A single PartiQL statement execution request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementRequest {
    pub statement: String,
    pub parameters: Vec<SourceValue>,
    /// Items to evaluate per page, passed through to the store
    pub limit: Option<u64>,
    pub next_token: Option<String>,
    pub return_consumed_capacity: bool,
}

impl StatementRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<SourceValue>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_next_token(mut self, token: Option<String>) -> Self {
        self.next_token = token;
        self
    }

    pub fn with_consumed_capacity(mut self) -> Self {
        self.return_consumed_capacity = true;
        self
    }
}

/// Capacity units the store reports for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedCapacity {
    pub table_name: Option<String>,
    pub capacity_units: Option<f64>,
    pub read_capacity_units: Option<f64>,
    pub write_capacity_units: Option<f64>,
}

/// One page of statement results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementPage {
    pub items: Vec<SourceRow>,
    /// Continuation token; `None` or empty means the result set is exhausted
    pub next_token: Option<String>,
    pub consumed_capacity: Option<ConsumedCapacity>,
}

impl StatementPage {
    pub fn new(items: Vec<SourceRow>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// Continuation token if another page is available
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTablesRequest {
    pub exclusive_start_table_name: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePage {
    pub table_names: Vec<String>,
    pub last_evaluated_table_name: Option<String>,
}

/// Client for the remote store
///
/// Implementations own authentication and HTTP plumbing; the engine only
/// issues statements and metadata lookups through this trait.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// Execute one PartiQL statement and return a single page
    async fn execute_statement(&self, request: StatementRequest) -> Result<StatementPage>;

    /// Describe a table's key schema and indexes
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription>;

    /// List one page of table names
    async fn list_tables(&self, request: ListTablesRequest) -> Result<TablePage>;
}
