//! Shared cursor queue for the worker pool.
//!
//! Work is partitioned by page-cursor claims rather than static
//! sub-ranges: each claim names one page (a window plus an optional
//! continuation cursor), and a worker that finishes a page pushes the
//! chain's successor claim back onto the queue. Workers that finish
//! early pick up whatever claim is pending next, so uneven page costs
//! never leave a worker idle while work remains.

use girder_client::page::{DateWindow, PageToken};
use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};

/// One unit of fetch work: a single page of one pagination chain.
#[derive(Debug, Clone)]
pub struct PageClaim {
    /// Window of the chain this page belongs to.
    pub window: DateWindow,
    /// Continuation cursor, or `None` for the chain's first page.
    pub cursor: Option<PageToken>,
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<PageClaim>,
    in_flight: usize,
}

/// Thread-safe claim queue with completion tracking.
///
/// The queue distinguishes "empty right now" from "finished": a chain's
/// successor claim only exists once its predecessor completes, so an
/// idle worker must wait while any claim is in flight. [`Self::claim`]
/// returns `None` only when the queue is drained and nothing is in
/// flight, which is the pool's termination condition.
#[derive(Debug)]
pub(crate) struct CursorQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl CursorQueue {
    /// Create a queue seeded with the initial claims (one per chunk of
    /// the split date window, no cursor).
    pub(crate) fn seeded(claims: Vec<PageClaim>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: claims.into(),
                in_flight: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Pop the next claim, waiting while other claims are in flight.
    ///
    /// Returns `None` when all work is complete.
    pub(crate) async fn claim(&self) -> Option<PageClaim> {
        loop {
            // Register for notification before inspecting state, so a
            // completion between the check and the await is not missed.
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if let Some(claim) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(claim);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark a claim finished, optionally enqueueing its chain successor.
    pub(crate) async fn complete(&self, successor: Option<PageClaim>) {
        {
            let mut state = self.state.lock().await;
            state.in_flight -= 1;
            if let Some(claim) = successor {
                state.pending.push_back(claim);
            }
        }
        self.notify.notify_waiters();
    }

    /// Drop all pending claims (cooperative cancellation). In-flight
    /// claims are unaffected; their workers finish normally.
    pub(crate) async fn drain(&self) {
        {
            let mut state = self.state.lock().await;
            state.pending.clear();
        }
        self.notify.notify_waiters();
    }
}
