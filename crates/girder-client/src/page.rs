//! Page, cursor, and date-window types for remote pagination.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum chunk width (in days) when splitting a window for parallel
/// fetching. Windows at or below this width are never split; splitting
/// smaller ranges produces more requests than it saves.
pub const MIN_CHUNK_DAYS: i64 = 30;

/// An inclusive `[start, end]` calendar date range.
///
/// Used both as the query filter sent to the remote API and as the unit
/// of work-queue seeding: a wide window is split into chunk sub-windows so
/// multiple pagination chains can run in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window. Callers are expected to have validated
    /// `end >= start`; an inverted window fetches nothing.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered, counting both endpoints.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Split the window into up to `max_chunks` contiguous sub-windows.
    ///
    /// Small windows (≤ [`MIN_CHUNK_DAYS`]) are returned whole, and chunks
    /// are never narrower than [`MIN_CHUNK_DAYS`], so the actual number of
    /// chunks may be below `max_chunks`. Chunks cover the window exactly,
    /// with no gap or overlap.
    #[must_use]
    pub fn split_into(&self, max_chunks: usize) -> Vec<DateWindow> {
        let total_days = self.days();
        if total_days <= MIN_CHUNK_DAYS || max_chunks <= 1 {
            return vec![self.clone()];
        }

        let days_per_chunk = std::cmp::max(MIN_CHUNK_DAYS, total_days / max_chunks as i64);
        let mut chunks = Vec::new();
        let mut current_start = self.start;
        while current_start <= self.end {
            let current_end = std::cmp::min(
                current_start + Duration::days(days_per_chunk - 1),
                self.end,
            );
            chunks.push(DateWindow::new(current_start, current_end));
            current_start = current_end + Duration::days(1);
        }
        chunks
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Opaque continuation token for remote pagination.
///
/// The value is meaningful only to the server; clients pass it back
/// verbatim to fetch the page after the one that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(pub String);

impl PageToken {
    /// Create a token from any string-like value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page request: a date window, an optional continuation cursor, and
/// the requested page size.
///
/// `cursor == None` requests the first page of the window's chain.
#[derive(Debug, Clone)]
pub struct PageQuery {
    /// Date window the chain is scoped to.
    pub window: DateWindow,
    /// Continuation cursor from the previous page, if any.
    pub cursor: Option<PageToken>,
    /// Maximum number of records the server should return.
    pub page_size: usize,
}

/// One page of raw issue records plus the continuation cursor.
///
/// Records are kept as raw JSON values at this layer; the engine's model
/// module owns normalization so that heterogeneous per-type field shapes
/// are handled in exactly one place.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    /// Raw issue records exactly as the server returned them.
    pub records: Vec<serde_json::Value>,
    /// Cursor for the next page, or `None` at end of results.
    pub next: Option<PageToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(date(start), date(end))
    }

    mod days {
        use super::*;

        #[test]
        fn single_day_counts_one() {
            assert_eq!(window("2024-01-01", "2024-01-01").days(), 1);
        }

        #[test]
        fn endpoints_are_inclusive() {
            assert_eq!(window("2024-01-01", "2024-01-31").days(), 31);
        }
    }

    mod split {
        use super::*;

        #[test]
        fn small_window_is_not_split() {
            let w = window("2024-01-01", "2024-01-30");
            assert_eq!(w.split_into(5), vec![w]);
        }

        #[test]
        fn single_chunk_request_is_not_split() {
            let w = window("2024-01-01", "2024-12-31");
            assert_eq!(w.split_into(1), vec![w]);
        }

        #[test]
        fn wide_window_splits_evenly() {
            let w = window("2024-01-01", "2024-10-26"); // 300 days
            let chunks = w.split_into(3);
            assert_eq!(chunks.len(), 3);
            assert_eq!(chunks[0].days(), 100);
            assert_eq!(chunks[1].days(), 100);
            assert_eq!(chunks[2].days(), 100);
        }

        #[test]
        fn chunks_are_contiguous_and_cover_the_window() {
            let w = window("2023-03-15", "2024-07-02");
            let chunks = w.split_into(4);
            assert_eq!(chunks.first().unwrap().start, w.start);
            assert_eq!(chunks.last().unwrap().end, w.end);
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
            }
            let total: i64 = chunks.iter().map(DateWindow::days).sum();
            assert_eq!(total, w.days());
        }

        #[test]
        fn chunks_respect_minimum_width() {
            // 90 days across 10 requested chunks: 30-day floor wins.
            let w = window("2024-01-01", "2024-03-30");
            let chunks = w.split_into(10);
            assert_eq!(chunks.len(), 3);
            assert!(chunks.iter().all(|c| c.days() == 30));
        }
    }

    #[test]
    fn window_display_is_range_notation() {
        let w = window("2024-01-01", "2024-02-01");
        assert_eq!(w.to_string(), "2024-01-01..2024-02-01");
    }

    #[test]
    fn page_token_round_trips() {
        let token = PageToken::new("abc123");
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(token.to_string(), "abc123");
    }
}
