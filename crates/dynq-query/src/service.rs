//! Query service
//!
//! Ties planning, pagination, sorting and frame assembly together for the
//! host. One call is one logical task; the only awaits are transport calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dynq_core::{
    DynqError, EngineConfig, ErrorResponse, Frame, QuerySpec, Result, StoreTransport,
};
use dynq_frame::build_frame;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collector::{Collector, StopReason, trim_to_limit};
use crate::planner::{NativeOrderPlan, plan_native_order};
use crate::sorter::{SortPlan, resolve_sort, sort_items};
use crate::tables::{self, HealthCheckResult};

/// Result of a single query
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Unique id for correlating logs with this execution
    pub id: Uuid,
    pub frame: Frame,
    pub pages: u32,
    pub stop_reason: StopReason,
    /// Whether the store ordered the rows through an injected ORDER BY
    pub native_order_applied: bool,
    /// Client-side sort that was applied, if any
    pub sort: Option<SortPlan>,
    pub elapsed: Duration,
}

impl QueryOutcome {
    pub fn is_partial(&self) -> bool {
        self.stop_reason.is_partial()
    }
}

/// One query from a host batch, as raw JSON
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub ref_id: String,
    pub json: Vec<u8>,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, json: impl Into<Vec<u8>>) -> Self {
        Self {
            ref_id: ref_id.into(),
            json: json.into(),
        }
    }
}

/// Per-query response: frames on success, an error otherwise
#[derive(Debug, Clone, Default)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    pub error: Option<ErrorResponse>,
}

impl DataResponse {
    fn from_error(err: &DynqError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(ErrorResponse::from(err)),
        }
    }
}

/// Service for executing PartiQL queries against the store
pub struct QueryService {
    transport: Arc<dyn StoreTransport>,
    config: EngineConfig,
}

impl QueryService {
    pub fn new(transport: Arc<dyn StoreTransport>, config: EngineConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every query in a host batch independently
    ///
    /// A failing query only affects its own response.
    #[tracing::instrument(skip(self, queries, cancel), fields(count = queries.len()))]
    pub async fn query_data(
        &self,
        queries: &[DataQuery],
        cancel: &CancellationToken,
    ) -> IndexMap<String, DataResponse> {
        let mut responses = IndexMap::with_capacity(queries.len());

        for query in queries {
            let response = match QuerySpec::from_json(&query.json) {
                Ok(spec) => match self.query(&spec, &query.ref_id, cancel).await {
                    Ok(outcome) => DataResponse {
                        frames: vec![outcome.frame],
                        error: None,
                    },
                    Err(err) => {
                        tracing::error!(ref_id = %query.ref_id, error = %err, "query failed");
                        DataResponse::from_error(&err)
                    }
                },
                Err(err) => {
                    tracing::warn!(ref_id = %query.ref_id, error = %err, "invalid query model");
                    DataResponse::from_error(&err)
                }
            };
            responses.insert(query.ref_id.clone(), response);
        }

        responses
    }

    /// Execute one query and materialize its frame
    #[tracing::instrument(skip(self, spec, cancel), fields(ref_id = %ref_id))]
    pub async fn query(
        &self,
        spec: &QuerySpec,
        ref_id: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();
        let id = Uuid::new_v4();

        if spec.statement.trim().is_empty() {
            return Err(DynqError::Validation("query text cannot be empty".to_string()));
        }

        let hints = spec.datetime_hints();

        let plan = if spec.scan_index_forward.is_some() {
            plan_native_order(self.transport.as_ref(), spec).await
        } else {
            NativeOrderPlan::unchanged(spec.statement.as_str())
        };

        tracing::debug!(
            %id,
            native = plan.native_applied,
            statement = %plan.statement,
            "executing query"
        );

        let collector = Collector::new(self.transport.as_ref(), self.config.collector_limits().clone());
        let collected = collector.collect(&plan.statement, spec.limit, cancel).await?;
        let pages = collected.pages;
        let stop_reason = collected.stop_reason;
        let mut items = collected.items;

        if items.is_empty() {
            return Ok(QueryOutcome {
                id,
                frame: Frame::new(ref_id),
                pages,
                stop_reason,
                native_order_applied: plan.native_applied,
                sort: None,
                elapsed: started.elapsed(),
            });
        }

        let sort = resolve_sort(spec, &plan, items.first());
        if let Some(sort) = &sort {
            sort_items(&mut items, &sort.field, sort.direction);
        }

        trim_to_limit(&mut items, spec.limit);

        let frame = build_frame(ref_id, &items, hints)?;

        tracing::info!(
            %id,
            rows = frame.row_count(),
            columns = frame.columns.len(),
            pages,
            stop_reason = %stop_reason,
            "query finished"
        );

        Ok(QueryOutcome {
            id,
            frame,
            pages,
            stop_reason,
            native_order_applied: plan.native_applied,
            sort,
            elapsed: started.elapsed(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        tables::list_all_tables(self.transport.as_ref()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn table_attributes(&self, table: &str) -> Result<Vec<String>> {
        tables::discover_table_attributes(self.transport.as_ref(), table).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn check_health(&self) -> HealthCheckResult {
        tables::check_health(self.transport.as_ref(), self.config.connection_test_table()).await
    }
}
