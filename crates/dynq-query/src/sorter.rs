//! Client-side ordering of collected items

use std::cmp::Ordering;

use dynq_core::{QuerySpec, SortDirection, SourceRow, SourceValue};

use crate::planner::NativeOrderPlan;

/// Field names probed, in order, when native ordering was requested but no
/// sort field could be resolved
pub const HEURISTIC_SORT_FIELDS: &[&str] = &["timestamp", "created_at", "createdAt", "date", "time"];

/// Why a client-side sort field was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortSource {
    /// The caller asked for it explicitly
    Explicit,
    /// The planner's suggestion after native ordering was declined
    NativeFallback,
    /// A well-known timestamp-like field found on the first row
    Heuristic,
}

/// A resolved client-side sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPlan {
    pub field: String,
    pub direction: SortDirection,
    pub source: SortSource,
}

/// Pick the client-side sort to apply, if any
pub fn resolve_sort(
    spec: &QuerySpec,
    plan: &NativeOrderPlan,
    first_row: Option<&SourceRow>,
) -> Option<SortPlan> {
    if let Some(field) = spec.explicit_sort_field() {
        return Some(SortPlan {
            field: field.to_string(),
            direction: spec.sort_direction,
            source: SortSource::Explicit,
        });
    }

    if plan.native_applied {
        return None;
    }

    let direction = SortDirection::from_scan_forward(spec.scan_index_forward.unwrap_or(true));
    if let Some(field) = plan.fallback_field.as_deref().filter(|f| !f.is_empty()) {
        return Some(SortPlan {
            field: field.to_string(),
            direction,
            source: SortSource::NativeFallback,
        });
    }

    // The heuristic only applies when native ordering was asked for
    if spec.scan_index_forward.is_none() {
        return None;
    }
    let row = first_row?;
    HEURISTIC_SORT_FIELDS
        .iter()
        .find(|field| row.contains_key(**field))
        .map(|field| SortPlan {
            field: field.to_string(),
            direction,
            source: SortSource::Heuristic,
        })
}

/// Kind shared by every non-null sort value, when there is one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKind {
    Text,
    Number,
    Bool,
}

fn uniform_kind(items: &[SourceRow], field: &str) -> Option<SortKind> {
    let mut kind = None;
    for value in items.iter().filter_map(|row| row.get(field)).filter(|v| !v.is_null()) {
        let this = match value {
            SourceValue::S(_) => SortKind::Text,
            SourceValue::N(raw) if raw.trim().parse::<f64>().is_ok_and(|f| !f.is_nan()) => {
                SortKind::Number
            }
            SourceValue::Bool(_) => SortKind::Bool,
            _ => return None,
        };
        match kind {
            None => kind = Some(this),
            Some(seen) if seen == this => {}
            Some(_) => return None,
        }
    }
    kind
}

/// Stable sort of `items` by `field`
///
/// Missing and NULL values always sort last. Pairs of different or
/// unsupported value kinds keep their relative order. Values of a single
/// sortable kind use the slice sort; mixed kinds use insertion sort.
pub fn sort_items(items: &mut [SourceRow], field: &str, direction: SortDirection) {
    if field.is_empty() || items.len() < 2 {
        return;
    }

    let kind = uniform_kind(items, field);
    tracing::debug!(
        field,
        direction = direction.as_sql(),
        count = items.len(),
        uniform = kind.is_some(),
        "sorting items"
    );

    if kind.is_some() {
        items.sort_by(|a, b| compare_rows(a.get(field), b.get(field), direction));
        return;
    }

    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && is_less(items[j].get(field), items[j - 1].get(field), direction) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Total order over values of one kind, nulls last in both directions
fn compare_rows(
    a: Option<&SourceValue>,
    b: Option<&SourceValue>,
    direction: SortDirection,
) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
            if direction.is_descending() {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn is_less(a: Option<&SourceValue>, b: Option<&SourceValue>, direction: SortDirection) -> bool {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    let (a, b) = match (a, b) {
        (None, _) => return false,
        (Some(_), None) => return true,
        (Some(a), Some(b)) => (a, b),
    };

    let Some(ordering) = compare_values(a, b) else {
        return false;
    };

    if direction.is_descending() {
        ordering == Ordering::Greater
    } else {
        ordering == Ordering::Less
    }
}

/// Compare two values of the same sortable kind
fn compare_values(a: &SourceValue, b: &SourceValue) -> Option<Ordering> {
    match (a, b) {
        (SourceValue::S(a), SourceValue::S(b)) => Some(a.cmp(b)),
        (SourceValue::N(a), SourceValue::N(b)) => {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) => Some(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
                _ => Some(a.cmp(b)),
            }
        }
        (SourceValue::Bool(a), SourceValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
