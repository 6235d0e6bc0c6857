//! Bounded, cancellable pagination over statement results

use std::fmt;

use dynq_core::{
    CollectorLimits, DynqError, Result, SourceRow, StatementRequest, StoreTransport,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why collection stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The store returned no continuation token
    Exhausted,
    /// The caller's row limit was reached
    LimitReached,
    /// The configured item ceiling was reached
    ItemCeiling,
    /// Cancelled after some rows were collected
    Cancelled,
    /// The wall-clock budget ran out after some rows were collected
    DeadlineExceeded,
    /// The page ceiling was hit after some rows were collected
    PageCeiling,
    /// A page fetch failed after some rows were collected
    FetchFailed(String),
}

impl StopReason {
    /// Whether the result set may be missing rows the store would return
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::DeadlineExceeded | Self::PageCeiling | Self::FetchFailed(_)
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("exhausted"),
            Self::LimitReached => f.write_str("limit reached"),
            Self::ItemCeiling => f.write_str("item ceiling reached"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
            Self::PageCeiling => f.write_str("page ceiling reached"),
            Self::FetchFailed(err) => write!(f, "fetch failed: {}", err),
        }
    }
}

/// Rows gathered by a [`Collector`]
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub items: Vec<SourceRow>,
    /// Number of pages successfully fetched
    pub pages: u32,
    pub stop_reason: StopReason,
}

impl Collected {
    pub fn is_partial(&self) -> bool {
        self.stop_reason.is_partial()
    }
}

/// Drives the page-fetch loop for one statement
pub struct Collector<'a> {
    transport: &'a dyn StoreTransport,
    limits: CollectorLimits,
}

impl<'a> Collector<'a> {
    pub fn new(transport: &'a dyn StoreTransport, limits: CollectorLimits) -> Self {
        Self { transport, limits }
    }

    /// Fetch pages until exhausted, limited, cancelled, or out of budget
    ///
    /// Interruptions return the rows gathered so far when there are any,
    /// and an error only when nothing was collected.
    pub async fn collect(
        &self,
        statement: &str,
        limit: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Collected> {
        let started = Instant::now();
        let max_duration = self.limits.max_duration();
        let max_pages = self.limits.max_pages();

        let mut items: Vec<SourceRow> = Vec::new();
        let mut attempts: u32 = 0;
        let mut pages: u32 = 0;
        let mut next_token: Option<String> = None;

        let stop_reason = loop {
            if cancel.is_cancelled() {
                tracing::warn!(pages, items = items.len(), "query cancelled");
                break interrupt(&items, StopReason::Cancelled, || {
                    DynqError::Cancelled("context canceled".to_string())
                })?;
            }

            attempts += 1;

            if started.elapsed() > max_duration {
                tracing::warn!(?max_duration, pages, items = items.len(), "maximum query duration reached");
                break interrupt(&items, StopReason::DeadlineExceeded, || {
                    DynqError::Timeout(format!(
                        "query exceeded maximum duration of {}s",
                        max_duration.as_secs_f64()
                    ))
                })?;
            }

            if attempts > max_pages {
                tracing::error!(max_pages, items = items.len(), "maximum page limit reached");
                break interrupt(&items, StopReason::PageCeiling, || {
                    DynqError::LimitExceeded(format!(
                        "query exceeded maximum page limit of {}",
                        max_pages
                    ))
                })?;
            }

            tracing::debug!(page = attempts, "fetching page");

            let request = StatementRequest::new(statement)
                .with_limit(limit)
                .with_next_token(next_token.take());

            // An in-flight fetch is never aborted; cancellation is observed between pages
            let page = match self.transport.execute_statement(request).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(error = %err, page = attempts, "query execution error");
                    let reason = if err.is_cancelled() {
                        StopReason::Cancelled
                    } else {
                        StopReason::FetchFailed(err.to_string())
                    };
                    break interrupt(&items, reason, move || {
                        if err.is_cancelled() {
                            err
                        } else {
                            err.context("executes statement")
                        }
                    })?;
                }
            };

            pages += 1;
            let continuation = page.continuation().map(str::to_string);
            let in_page = page.items.len();
            items.extend(page.items);

            tracing::debug!(page = attempts, in_page, total = items.len(), "page results");

            if items.len() >= self.limits.max_items() {
                tracing::warn!(max_items = self.limits.max_items(), "maximum item limit reached");
                break StopReason::ItemCeiling;
            }

            if let Some(limit) = limit
                && items.len() as u64 >= limit
            {
                tracing::info!(limit, total = items.len(), "reached requested limit");
                break StopReason::LimitReached;
            }

            match continuation {
                Some(token) => next_token = Some(token),
                None => {
                    tracing::info!(pages, total = items.len(), "query complete");
                    break StopReason::Exhausted;
                }
            }
        };

        Ok(Collected {
            items,
            pages,
            stop_reason,
        })
    }
}

/// Partial-or-error policy shared by every interruption
fn interrupt(
    items: &[SourceRow],
    reason: StopReason,
    error: impl FnOnce() -> DynqError,
) -> Result<StopReason> {
    if items.is_empty() {
        return Err(error());
    }
    tracing::warn!(total = items.len(), reason = %reason, "returning partial results");
    Ok(reason)
}

/// Trim to the caller's limit, keeping the leading rows
///
/// Returns the number of rows removed.
pub fn trim_to_limit(items: &mut Vec<SourceRow>, limit: Option<u64>) -> usize {
    let Some(limit) = limit else {
        return 0;
    };
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    if items.len() <= limit {
        return 0;
    }

    let removed = items.len() - limit;
    tracing::info!(before = items.len(), after = limit, "trimming results to requested limit");
    items.truncate(limit);
    removed
}
