//! Native ORDER BY planning
//!
//! PartiQL can only order results within a single partition, so an
//! `ORDER BY` on the sort key is injected only when the statement pins the
//! partition key with an equality predicate. Everything else falls back to
//! a client-side sort on the field this planner suggests.

use std::sync::LazyLock;

use dynq_core::{KeySchema, QuerySpec, SortDirection, StoreTransport};
use regex::Regex;

static FROM_QUOTED_WITH_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)FROM\s+"([^"]+)"\s+INDEX\s+"([^"]+)""#).expect("valid regex")
});

static FROM_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)FROM\s+"([^"]+)""#).expect("valid regex"));

static FROM_UNQUOTED_WITH_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)FROM\s+([^\s"]+)\s+INDEX\s+([^\s"]+)"#).expect("valid regex")
});

static FROM_UNQUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)FROM\s+([^\s";]+)"#).expect("valid regex"));

/// Outcome of native order planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeOrderPlan {
    /// Statement to execute, possibly rewritten
    pub statement: String,
    /// Whether the store will return rows already ordered
    pub native_applied: bool,
    /// Field to sort on client-side when native ordering was not achieved
    pub fallback_field: Option<String>,
}

impl NativeOrderPlan {
    /// A plan that leaves the statement untouched
    pub fn unchanged(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            native_applied: false,
            fallback_field: None,
        }
    }

    fn declined(statement: &str, fallback_field: Option<String>) -> Self {
        Self {
            statement: statement.to_string(),
            native_applied: false,
            fallback_field,
        }
    }
}

/// Whether the statement already orders its results
pub fn has_order_by(statement: &str) -> bool {
    statement.to_uppercase().contains("ORDER BY")
}

/// Extract the table and optional index named in the FROM clause
pub fn extract_table_and_index(statement: &str) -> Option<(String, Option<String>)> {
    const QUOTES: &[char] = &['"', '\''];

    if let Some(caps) = FROM_QUOTED_WITH_INDEX.captures(statement) {
        return Some((caps[1].to_string(), Some(caps[2].to_string())));
    }
    if let Some(caps) = FROM_QUOTED.captures(statement) {
        return Some((caps[1].to_string(), None));
    }
    if let Some(caps) = FROM_UNQUOTED_WITH_INDEX.captures(statement) {
        return Some((
            caps[1].trim_matches(QUOTES).to_string(),
            Some(caps[2].trim_matches(QUOTES).to_string()),
        ));
    }
    FROM_UNQUOTED
        .captures(statement)
        .map(|caps| (caps[1].trim_matches(QUOTES).to_string(), None))
        .filter(|(table, _)| !table.is_empty())
}

/// Whether the statement compares the partition key with a literal `=`
///
/// Only the first comparison found for the key counts; `IN`, `BETWEEN`
/// and range or inequality operators do not pin a single partition.
pub fn partition_key_has_equality(statement: &str, partition_key: &str) -> bool {
    if partition_key.is_empty() {
        return false;
    }

    let escaped = regex::escape(partition_key);
    let boundary = |c: Option<char>| match c {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    };
    let pattern = format!(
        r#"(?i)(?:"{}"|{}{}{})\s*(=|IN|BETWEEN|<>|!=|<=|>=|<|>)"#,
        escaped,
        boundary(partition_key.chars().next()),
        escaped,
        boundary(partition_key.chars().last()),
    );
    let detector = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(partition_key, error = %err, "failed to build partition key detector");
            return false;
        }
    };

    detector
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .is_some_and(|op| op.as_str().trim() == "=")
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_identifier(identifier: &str) -> String {
    if identifier.is_empty() {
        return String::new();
    }
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Append `ORDER BY "<sort_key>" ASC|DESC` before any trailing terminator
///
/// Returns `None` when injection is not possible: no sort key, or no
/// `WHERE` clause. A statement that already orders is returned as is.
pub fn inject_order_by(statement: &str, sort_key: &str, direction: SortDirection) -> Option<String> {
    if sort_key.is_empty() {
        return None;
    }

    let upper = statement.to_uppercase();
    if upper.contains("ORDER BY") {
        return Some(statement.to_string());
    }
    if !upper.contains("WHERE") {
        tracing::warn!("cannot add ORDER BY without WHERE clause, using client-side sorting");
        return None;
    }

    let trimmed = statement.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let rewritten = format!(
        "{} ORDER BY {} {}",
        trimmed,
        quote_identifier(sort_key),
        direction.as_sql()
    );

    tracing::info!(field = sort_key, direction = direction.as_sql(), "injected ORDER BY clause");
    Some(rewritten)
}

/// Decide whether the key schema allows native ordering of `statement`
///
/// Returns the sort key to inject, or the plan to fall back to.
fn check_native_order(
    statement: &str,
    requested_sort_key: Option<&str>,
    schema: &KeySchema,
) -> Result<String, NativeOrderPlan> {
    let fallback = requested_sort_key
        .map(str::to_string)
        .or_else(|| schema.sort_key.clone());

    let Some(sort_key) = schema.sort_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::warn!("native sort requested but table/index has no sort key");
        return Err(NativeOrderPlan::declined(statement, fallback));
    };

    if let Some(requested) = requested_sort_key
        && !requested.eq_ignore_ascii_case(sort_key)
    {
        tracing::warn!(
            requested,
            schema_sort_key = sort_key,
            "requested sort key is not part of the primary key for native sort"
        );
        return Err(NativeOrderPlan::declined(statement, fallback));
    }

    let Some(partition_key) = schema.partition_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::warn!("unable to determine partition key for native sort");
        return Err(NativeOrderPlan::declined(statement, fallback));
    };

    if !partition_key_has_equality(statement, partition_key) {
        tracing::warn!(
            partition_key,
            "cannot apply native ORDER BY without partition key equality"
        );
        return Err(NativeOrderPlan::declined(statement, fallback));
    }

    Ok(sort_key.to_string())
}

/// Plan native ordering for a query that requested a scan direction
///
/// Never fails: every obstacle degrades to a client-side fallback plan.
pub async fn plan_native_order(transport: &dyn StoreTransport, spec: &QuerySpec) -> NativeOrderPlan {
    let statement = spec.statement.as_str();
    let requested_sort_key = spec.requested_sort_key();

    let Some(forward) = spec.scan_index_forward else {
        return NativeOrderPlan::unchanged(statement);
    };

    if has_order_by(statement) {
        tracing::debug!("query already contains ORDER BY clause, skipping injection");
        return NativeOrderPlan {
            statement: statement.to_string(),
            native_applied: true,
            fallback_field: requested_sort_key.map(str::to_string),
        };
    }

    let Some((table, index)) = extract_table_and_index(statement) else {
        tracing::warn!("native sort requested but table name could not be determined from query");
        return NativeOrderPlan::declined(statement, requested_sort_key.map(str::to_string));
    };

    let schema = match transport.describe_table(&table).await {
        Ok(description) => description.key_schema_for(index.as_deref()),
        Err(err) => Err(err),
    };
    let schema = match schema {
        Ok(schema) => schema,
        Err(err) => {
            tracing::warn!(
                table = %table,
                index = ?index,
                error = %err,
                "failed to describe table for native sort"
            );
            return NativeOrderPlan::declined(statement, requested_sort_key.map(str::to_string));
        }
    };

    let sort_key = match check_native_order(statement, requested_sort_key, &schema) {
        Ok(sort_key) => sort_key,
        Err(plan) => return plan,
    };

    match inject_order_by(statement, &sort_key, SortDirection::from_scan_forward(forward)) {
        Some(rewritten) => NativeOrderPlan {
            statement: rewritten,
            native_applied: true,
            fallback_field: Some(sort_key),
        },
        None => NativeOrderPlan::declined(
            statement,
            requested_sort_key.map(str::to_string).or(Some(sort_key)),
        ),
    }
}
