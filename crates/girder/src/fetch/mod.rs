//! Concurrent fetch coordinator.
//!
//! Drives a bounded pool of workers over the full date window. Work is
//! claimed page-by-page from a shared [`queue::CursorQueue`]; results
//! accumulate in an append-only collector that is only read after every
//! worker has joined (the barrier), so the resolver never observes a
//! partially fetched page set.
//!
//! Failure policy: one page exhausting its retries abandons that chain
//! but never aborts the others. The coordinator tallies failures at the
//! barrier and either returns the union of successful pages (the caller
//! attaches a partial-fetch warning) or fails the whole run when the
//! failed fraction exceeds the configured threshold.

mod queue;

pub use self::queue::PageClaim;

use self::queue::CursorQueue;
use crate::error::{Error, Result};
use girder_client::page::{DateWindow, PageQuery, PageToken, RawPage};
use girder_client::source::PageSource;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of fetch workers.
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Default records per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default fraction of failed pages (strictly) above which a run aborts.
pub const DEFAULT_ABORT_FAILURE_RATIO: f64 = 0.5;

/// Cooperative cancellation flag shared by a run's workers.
///
/// Setting the flag stops workers from claiming new pages; in-flight
/// requests complete (or time out) normally and their results are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Full date window to fetch.
    pub window: DateWindow,
    /// Worker pool size; must be at least 1.
    pub worker_count: usize,
    /// Records requested per page.
    pub page_size: usize,
    /// Failed-page fraction above which the run aborts. The threshold is
    /// strict: a run aborts only when `failed / attempted` exceeds it.
    pub abort_failure_ratio: f64,
}

impl FetchOptions {
    /// Options with defaults for everything but the window.
    #[must_use]
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            worker_count: DEFAULT_WORKER_COUNT,
            page_size: DEFAULT_PAGE_SIZE,
            abort_failure_ratio: DEFAULT_ABORT_FAILURE_RATIO,
        }
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a non-positive worker count or page
    /// size, an inverted date window, or an abort ratio outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count < 1 {
            return Err(Error::Config(format!(
                "worker count must be at least 1, got {}",
                self.worker_count
            )));
        }
        // A zero page size can make a server return empty pages with a
        // cursor forever, so the chain would never terminate.
        if self.page_size < 1 {
            return Err(Error::Config(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.window.end < self.window.start {
            return Err(Error::Config(format!(
                "date window end {} is before start {}",
                self.window.end, self.window.start
            )));
        }
        if !(0.0..=1.0).contains(&self.abort_failure_ratio) {
            return Err(Error::Config(format!(
                "abort failure ratio must be within [0, 1], got {}",
                self.abort_failure_ratio
            )));
        }
        Ok(())
    }
}

/// A page claim that failed terminally after the source's retries.
#[derive(Debug)]
pub struct FailedPage {
    /// Window of the abandoned chain.
    pub window: DateWindow,
    /// Cursor of the failed page.
    pub cursor: Option<PageToken>,
    /// The terminal fetch error.
    pub error: girder_client::Error,
}

/// Result of one fetch run, produced at the barrier.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Union of all successfully fetched records, unordered across pages.
    pub records: Vec<Value>,
    /// Pages fetched successfully.
    pub pages_fetched: usize,
    /// Pages that failed terminally.
    pub failed: Vec<FailedPage>,
    /// Whether the run was cut short by cooperative cancellation.
    pub cancelled: bool,
}

impl FetchOutcome {
    /// Total pages attempted (fetched plus failed).
    #[must_use]
    pub fn pages_attempted(&self) -> usize {
        self.pages_fetched + self.failed.len()
    }
}

/// State shared by the workers of one run.
struct Shared {
    queue: CursorQueue,
    records: Mutex<Vec<Value>>,
    failed: Mutex<Vec<FailedPage>>,
    pages_fetched: AtomicUsize,
}

/// Fetch every page of the window with a bounded worker pool.
///
/// The window is split into chunk sub-windows to seed one pagination
/// chain per chunk; from there workers claim pages dynamically. On
/// cancellation the collected records are returned with
/// [`FetchOutcome::cancelled`] set.
///
/// # Errors
///
/// - [`Error::Config`] for invalid options, before any request is made.
/// - [`Error::FetchAborted`] when the failed-page fraction exceeds
///   `abort_failure_ratio` (never for cancelled runs).
pub async fn fetch_all(
    source: Arc<dyn PageSource>,
    options: &FetchOptions,
    cancel: CancelFlag,
) -> Result<FetchOutcome> {
    options.validate()?;

    let chunks = options.window.split_into(options.worker_count);
    tracing::info!(
        window = %options.window,
        chunks = chunks.len(),
        workers = options.worker_count,
        "starting fetch run"
    );

    let seeds = chunks
        .into_iter()
        .map(|window| PageClaim {
            window,
            cursor: None,
        })
        .collect();

    let shared = Arc::new(Shared {
        queue: CursorQueue::seeded(seeds),
        records: Mutex::new(Vec::new()),
        failed: Mutex::new(Vec::new()),
        pages_fetched: AtomicUsize::new(0),
    });

    let workers: Vec<_> = (0..options.worker_count)
        .map(|worker_id| {
            let shared = Arc::clone(&shared);
            let source = Arc::clone(&source);
            let cancel = cancel.clone();
            let page_size = options.page_size;
            tokio::spawn(async move {
                run_worker(worker_id, &shared, source.as_ref(), &cancel, page_size).await;
            })
        })
        .collect();

    // Barrier: the accumulator is only read after every worker joined.
    for worker in workers {
        if let Err(err) = worker.await {
            tracing::error!(error = %err, "fetch worker task failed");
        }
    }

    let records = std::mem::take(&mut *shared.records.lock().await);
    let failed = std::mem::take(&mut *shared.failed.lock().await);
    let outcome = FetchOutcome {
        records,
        pages_fetched: shared.pages_fetched.load(Ordering::Relaxed),
        failed,
        cancelled: cancel.is_cancelled(),
    };

    tracing::info!(
        pages_fetched = outcome.pages_fetched,
        pages_failed = outcome.failed.len(),
        records = outcome.records.len(),
        cancelled = outcome.cancelled,
        "fetch run complete"
    );

    let attempted = outcome.pages_attempted();
    if !outcome.cancelled && attempted > 0 {
        let failed_fraction = outcome.failed.len() as f64 / attempted as f64;
        if failed_fraction > options.abort_failure_ratio {
            return Err(Error::FetchAborted {
                failed: outcome.failed.len(),
                attempted,
            });
        }
    }

    Ok(outcome)
}

/// One worker: claim, fetch, merge, enqueue successor, repeat.
///
/// The cancellation flag is checked at each suspension point boundary:
/// before claiming and before enqueueing a successor. An in-flight
/// request is never torn down; its per-request timeout bounds the wait.
async fn run_worker(
    worker_id: usize,
    shared: &Shared,
    source: &dyn PageSource,
    cancel: &CancelFlag,
    page_size: usize,
) {
    loop {
        if cancel.is_cancelled() {
            shared.queue.drain().await;
            break;
        }
        let Some(claim) = shared.queue.claim().await else {
            break;
        };

        let query = PageQuery {
            window: claim.window.clone(),
            cursor: claim.cursor.clone(),
            page_size,
        };

        match source.fetch_page(&query).await {
            Ok(page) => {
                let successor = successor_claim(&claim, &page, cancel);
                tracing::debug!(
                    worker_id,
                    window = %claim.window,
                    records = page.records.len(),
                    has_next = successor.is_some(),
                    "page fetched"
                );
                shared.records.lock().await.extend(page.records);
                shared.pages_fetched.fetch_add(1, Ordering::Relaxed);
                shared.queue.complete(successor).await;
            }
            Err(error) => {
                tracing::warn!(
                    worker_id,
                    window = %claim.window,
                    cursor = claim.cursor.as_ref().map(PageToken::as_str),
                    error = %error,
                    "page failed terminally, abandoning chain"
                );
                shared.failed.lock().await.push(FailedPage {
                    window: claim.window,
                    cursor: claim.cursor,
                    error,
                });
                shared.queue.complete(None).await;
            }
        }
    }
}

/// Build the chain's next claim, unless the chain ended or the run was
/// cancelled in the meantime.
fn successor_claim(claim: &PageClaim, page: &RawPage, cancel: &CancelFlag) -> Option<PageClaim> {
    if cancel.is_cancelled() {
        return None;
    }
    page.next.clone().map(|token| PageClaim {
        window: claim.window.clone(),
        cursor: Some(token),
    })
}
