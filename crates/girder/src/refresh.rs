//! End-to-end refresh pipeline: fetch, normalize, resolve, publish.

use crate::cache::SnapshotCache;
use crate::error::{FailedPageSummary, Result, RunWarning};
use crate::fetch::{self, CancelFlag, FetchOptions};
use crate::hierarchy;
use crate::model::Issue;
use crate::snapshot::HierarchySnapshot;
use girder_client::source::PageSource;
use std::sync::Arc;

/// Outcome of one successful refresh run.
#[derive(Debug)]
pub struct RefreshReport {
    /// The snapshot that was published.
    pub snapshot: Arc<HierarchySnapshot>,
    /// Non-fatal conditions collected across the run.
    pub warnings: Vec<RunWarning>,
    /// Raw records fetched before normalization.
    pub records_fetched: usize,
    /// Records skipped because normalization rejected them.
    pub records_skipped: usize,
    /// Whether the run was cut short by cooperative cancellation.
    pub cancelled: bool,
}

/// Run one refresh: fetch all pages, normalize, resolve the hierarchy,
/// and publish the result to `cache`.
///
/// Per-page and per-record problems are absorbed into the report's
/// warnings. A cancelled run still publishes whatever was collected,
/// with [`RefreshReport::cancelled`] set.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] or [`crate::Error::FetchAborted`]
/// without touching the cache: any previously published snapshot stays
/// current.
pub async fn refresh(
    source: Arc<dyn PageSource>,
    cache: &SnapshotCache,
    options: &FetchOptions,
    cancel: CancelFlag,
) -> Result<RefreshReport> {
    let outcome = fetch::fetch_all(source, options, cancel).await?;

    let mut warnings = Vec::new();
    if !outcome.failed.is_empty() {
        warnings.push(RunWarning::PartialFetch {
            failed_pages: outcome.failed.len(),
            attempted_pages: outcome.pages_attempted(),
            pages: outcome
                .failed
                .iter()
                .map(|page| FailedPageSummary {
                    window: page.window.clone(),
                    cursor: page.cursor.clone(),
                    error: page.error.to_string(),
                })
                .collect(),
        });
    }

    let records_fetched = outcome.records.len();
    let mut issues = Vec::with_capacity(records_fetched);
    for (record_index, record) in outcome.records.iter().enumerate() {
        match Issue::from_raw(record) {
            Ok(issue) => issues.push(issue),
            Err(reason) => {
                tracing::warn!(record_index, %reason, "skipping malformed record");
                warnings.push(RunWarning::MalformedRecord {
                    record_index,
                    reason: reason.to_string(),
                });
            }
        }
    }
    let records_skipped = records_fetched - issues.len();

    let (snapshot, resolve_warnings) = hierarchy::resolve(issues, options.window.clone());
    warnings.extend(resolve_warnings);

    // Keep the Arc this publish installed: a racing refresh could swap
    // in its own snapshot before a `current()` read.
    let snapshot = cache.publish(snapshot);

    tracing::info!(
        records_fetched,
        records_skipped,
        issues = snapshot.len(),
        warnings = warnings.len(),
        cancelled = outcome.cancelled,
        "refresh complete"
    );

    Ok(RefreshReport {
        snapshot,
        warnings,
        records_fetched,
        records_skipped,
        cancelled: outcome.cancelled,
    })
}
