//! Atomically published snapshot cache.

use crate::error::{Error, Result};
use crate::model::Issue;
use crate::snapshot::{HierarchySnapshot, IssueFilter, SortKey, SortOrder};
use std::sync::{Arc, RwLock};

/// Holds at most one current [`HierarchySnapshot`].
///
/// Publication is a single pointer swap: readers that grabbed the
/// previous `Arc` keep a fully consistent view, and a query always runs
/// against whichever snapshot was current when it started.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: RwLock<Option<Arc<HierarchySnapshot>>>,
}

impl SnapshotCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `snapshot` as the current one, replacing any predecessor.
    ///
    /// Returns the installed `Arc`, so the caller can report exactly the
    /// snapshot this publish installed even if another publish races in
    /// right after.
    pub fn publish(&self, snapshot: HierarchySnapshot) -> Arc<HierarchySnapshot> {
        let snapshot = Arc::new(snapshot);
        tracing::info!(
            issues = snapshot.len(),
            unlinked = snapshot.unlinked.len(),
            window = %snapshot.date_range,
            "publishing snapshot"
        );
        // A poisoned lock means a writer panicked mid-swap; the swap
        // itself cannot leave partial state, so continue with the guard.
        let mut current = self.current.write().unwrap_or_else(|poisoned| {
            poisoned.into_inner()
        });
        *current = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// The currently published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCache`] before the first publish.
    pub fn current(&self) -> Result<Arc<HierarchySnapshot>> {
        let current = self.current.read().unwrap_or_else(|poisoned| {
            poisoned.into_inner()
        });
        current.clone().ok_or(Error::EmptyCache)
    }

    /// Filter and sort against the snapshot current at call time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCache`] before the first publish.
    pub fn query(
        &self,
        filter: &IssueFilter,
        key: SortKey,
        order: SortOrder,
    ) -> Result<Vec<Issue>> {
        let snapshot = self.current()?;
        Ok(snapshot.select(filter, key, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueKey, IssueType};
    use chrono::{DateTime, Utc};
    use girder_client::page::DateWindow;
    use std::collections::{HashMap, HashSet};

    fn snapshot(keys: &[&str]) -> HierarchySnapshot {
        let issues_by_key = keys
            .iter()
            .map(|key| {
                let issue = Issue {
                    key: IssueKey::from(*key),
                    issue_type: IssueType::Task,
                    summary: String::new(),
                    status: "Open".to_string(),
                    created_at: DateTime::UNIX_EPOCH,
                    updated_at: DateTime::UNIX_EPOCH,
                    parent_key: None,
                    raw_attributes: HashMap::new(),
                };
                (issue.key.clone(), issue)
            })
            .collect();
        HierarchySnapshot {
            issues_by_key,
            children_by_parent: HashMap::new(),
            unlinked: HashSet::new(),
            fetched_at: Utc::now(),
            date_range: DateWindow::new(
                "2024-01-01".parse().unwrap(),
                "2024-01-31".parse().unwrap(),
            ),
        }
    }

    #[test]
    fn current_before_publish_is_empty_cache() {
        let cache = SnapshotCache::new();
        assert!(matches!(cache.current(), Err(Error::EmptyCache)));
        assert!(matches!(
            cache.query(&IssueFilter::any(), SortKey::Key, SortOrder::Asc),
            Err(Error::EmptyCache)
        ));
    }

    #[test]
    fn publish_replaces_the_current_snapshot() {
        let cache = SnapshotCache::new();
        cache.publish(snapshot(&["A-1"]));
        assert_eq!(cache.current().unwrap().len(), 1);

        cache.publish(snapshot(&["A-1", "A-2"]));
        assert_eq!(cache.current().unwrap().len(), 2);
    }

    #[test]
    fn publish_returns_the_snapshot_it_installed() {
        let cache = SnapshotCache::new();
        let installed = cache.publish(snapshot(&["A-1"]));
        assert!(Arc::ptr_eq(&installed, &cache.current().unwrap()));

        // A later publish does not change what the earlier call returned.
        cache.publish(snapshot(&["A-1", "A-2"]));
        assert_eq!(installed.len(), 1);
    }

    #[test]
    fn old_reference_survives_a_publish() {
        let cache = SnapshotCache::new();
        cache.publish(snapshot(&["A-1"]));
        let held = cache.current().unwrap();

        cache.publish(snapshot(&["A-1", "A-2", "A-3"]));
        assert_eq!(held.len(), 1);
        assert_eq!(cache.current().unwrap().len(), 3);
    }

    #[test]
    fn query_runs_against_the_published_snapshot() {
        let cache = SnapshotCache::new();
        cache.publish(snapshot(&["B-2", "B-1"]));
        let rows = cache
            .query(&IssueFilter::any(), SortKey::Key, SortOrder::Asc)
            .unwrap();
        let keys: Vec<_> = rows.iter().map(|issue| issue.key.as_str()).collect();
        assert_eq!(keys, vec!["B-1", "B-2"]);
    }
}
