//! DYNQ Query - PartiQL query execution for the host
//!
//! This crate provides:
//!
//! - `planner` - Native ORDER BY injection when the key schema allows it
//! - `collector` - Bounded, cancellable pagination
//! - `sorter` - Stable client-side ordering with nulls last
//! - `tables` - Table listing, attribute discovery and health checks
//! - `QueryService` - The entry point tying these together

mod collector;
mod planner;
mod service;
mod sorter;
mod tables;

pub use collector::{Collected, Collector, StopReason, trim_to_limit};
pub use planner::{
    NativeOrderPlan, extract_table_and_index, has_order_by, inject_order_by,
    partition_key_has_equality, plan_native_order, quote_identifier,
};
pub use service::{DataQuery, DataResponse, QueryOutcome, QueryService};
pub use sorter::{HEURISTIC_SORT_FIELDS, SortPlan, SortSource, resolve_sort, sort_items};
pub use tables::{
    HealthCheckResult, HealthStatus, check_health, discover_table_attributes, list_all_tables,
};

#[cfg(test)]
mod mock_transport;

#[cfg(test)]
mod collector_tests;
#[cfg(test)]
mod planner_tests;
#[cfg(test)]
mod service_tests;
#[cfg(test)]
mod sorter_tests;
#[cfg(test)]
mod tables_tests;
