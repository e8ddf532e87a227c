//! Error and warning types for girder engine operations.
//!
//! The split follows the propagation policy: per-page and per-record
//! failures are absorbed into [`RunWarning`]s carried by run reports;
//! only configuration problems and run-level thresholds surface as
//! [`Error`] and fail a refresh.

use girder_client::page::{DateWindow, PageToken};
use thiserror::Error;

/// The error type for girder engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (worker count, date range, missing env).
    /// Fatal before any fetch starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// Too many pages failed outright; the run is abandoned and any
    /// previously published snapshot remains current.
    #[error("fetch aborted: {failed} of {attempted} pages failed")]
    FetchAborted {
        /// Pages that failed after exhausting their retries.
        failed: usize,
        /// Total pages attempted this run.
        attempted: usize,
    },

    /// A query was issued before any snapshot was published.
    #[error("no snapshot published yet")]
    EmptyCache,
}

/// A specialized Result type for girder engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions aggregated over a refresh run.
///
/// Warnings never fail the run; they are surfaced alongside a usable
/// snapshot so callers can report data-quality problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    /// At least one page failed all retries; the snapshot holds the
    /// union of the pages that did succeed.
    PartialFetch {
        /// Pages that failed terminally.
        failed_pages: usize,
        /// Total pages attempted.
        attempted_pages: usize,
        /// Which page claims failed, for operator follow-up.
        pages: Vec<FailedPageSummary>,
    },

    /// A raw record could not be normalized and was skipped.
    MalformedRecord {
        /// Index of the record in fetch order.
        record_index: usize,
        /// Why normalization rejected it.
        reason: String,
    },

    /// The same key appeared twice with differing content; the
    /// first-seen record was kept.
    DuplicateKey {
        /// The conflicting issue key.
        key: String,
    },
}

impl RunWarning {
    /// Human-readable description for logs and CLI output.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::PartialFetch {
                failed_pages,
                attempted_pages,
                ..
            } => format!(
                "partial fetch: {failed_pages} of {attempted_pages} pages failed"
            ),
            Self::MalformedRecord {
                record_index,
                reason,
            } => format!("record {record_index}: skipped malformed record: {reason}"),
            Self::DuplicateKey { key } => {
                format!("duplicate key {key} with differing content, kept first")
            }
        }
    }
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Identifies a failed page claim inside a [`RunWarning::PartialFetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPageSummary {
    /// Window of the pagination chain the claim belonged to.
    pub window: DateWindow,
    /// Cursor of the failed page (`None` for a chain's first page).
    pub cursor: Option<PageToken>,
    /// Rendered terminal error.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_descriptions_name_the_problem() {
        let warning = RunWarning::PartialFetch {
            failed_pages: 1,
            attempted_pages: 10,
            pages: vec![],
        };
        assert_eq!(
            warning.to_string(),
            "partial fetch: 1 of 10 pages failed"
        );

        let warning = RunWarning::DuplicateKey {
            key: "APP-7".into(),
        };
        assert!(warning.to_string().contains("APP-7"));
    }

    #[test]
    fn fetch_aborted_reports_counts() {
        let err = Error::FetchAborted {
            failed: 6,
            attempted: 10,
        };
        assert_eq!(err.to_string(), "fetch aborted: 6 of 10 pages failed");
    }
}
