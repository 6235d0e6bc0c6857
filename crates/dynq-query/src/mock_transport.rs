//! Scripted in-memory transport for tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dynq_core::{
    DynqError, ListTablesRequest, Result, SourceRow, SourceValue, StatementPage,
    StatementRequest, StoreTransport, TableDescription, TablePage,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// One scripted response to `execute_statement`
pub enum Scripted {
    Page(StatementPage),
    Fail(String),
}

/// Mock transport replaying scripted pages in call order
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Vec<Scripted>>,
    tables: HashMap<String, TableDescription>,
    table_pages: Mutex<Vec<TablePage>>,
    latency: Option<Duration>,
    cancel_on_call: Option<(usize, CancellationToken)>,
    pub requests: Mutex<Vec<StatementRequest>>,
    pub list_requests: Mutex<Vec<ListTablesRequest>>,
    pub describe_calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `items` in pages of `page_size`, chaining continuation tokens
    pub fn paged(items: Vec<SourceRow>, page_size: usize) -> Self {
        let chunks: Vec<Vec<SourceRow>> = items.chunks(page_size).map(<[_]>::to_vec).collect();
        let last = chunks.len().saturating_sub(1);
        let script = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let page = StatementPage::new(chunk);
                if i < last {
                    Scripted::Page(page.with_next_token(format!("token-{}", i + 1)))
                } else {
                    Scripted::Page(page)
                }
            })
            .collect();
        Self::new().with_script(script)
    }

    pub fn with_script(self, script: Vec<Scripted>) -> Self {
        *self.script.lock() = script;
        self
    }

    pub fn with_table(mut self, description: TableDescription) -> Self {
        self.tables.insert(description.table_name.clone(), description);
        self
    }

    pub fn with_table_pages(self, pages: Vec<TablePage>) -> Self {
        *self.table_pages.lock() = pages;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Cancel `token` while serving the `call`-th statement (1-based)
    pub fn with_cancel_on_call(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.statement.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl StoreTransport for MockTransport {
    async fn execute_statement(&self, request: StatementRequest) -> Result<StatementPage> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request);
            requests.len()
        };

        if let Some((at, token)) = &self.cancel_on_call
            && *at == call
        {
            token.cancel();
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = {
            let mut script = self.script.lock();
            (!script.is_empty()).then(|| script.remove(0))
        };

        match next {
            Some(Scripted::Page(page)) => Ok(page),
            Some(Scripted::Fail(message)) => Err(DynqError::Remote(message)),
            None => Ok(StatementPage::default()),
        }
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        self.describe_calls.lock().push(table_name.to_string());
        self.tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| DynqError::Remote(format!("table {} not found", table_name)))
    }

    async fn list_tables(&self, request: ListTablesRequest) -> Result<TablePage> {
        self.list_requests.lock().push(request);
        let mut pages = self.table_pages.lock();
        if pages.is_empty() {
            return Ok(TablePage::default());
        }
        Ok(pages.remove(0))
    }
}

pub fn row(fields: &[(&str, SourceValue)]) -> SourceRow {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn s(text: &str) -> SourceValue {
    SourceValue::S(text.into())
}

pub fn n(raw: &str) -> SourceValue {
    SourceValue::N(raw.into())
}

/// Rows `{id: N(i)}` for `0..count`
pub fn numbered_rows(count: usize) -> Vec<SourceRow> {
    (0..count).map(|i| row(&[("id", n(&i.to_string()))])).collect()
}
