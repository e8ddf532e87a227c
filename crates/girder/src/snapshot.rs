//! Immutable resolved snapshot and its query types.

use crate::model::{Issue, IssueKey, IssueType};
use chrono::{DateTime, Utc};
use girder_client::page::DateWindow;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// The fully resolved result of one refresh run.
///
/// A snapshot is immutable once built; the cache publishes it behind an
/// `Arc` and readers holding an old `Arc` keep a consistent view while a
/// newer snapshot replaces it.
#[derive(Debug, Clone)]
pub struct HierarchySnapshot {
    /// Every issue of the run, indexed by key.
    pub issues_by_key: HashMap<IssueKey, Issue>,
    /// Child keys per parent, in first-seen order. Only valid pairings
    /// appear here.
    pub children_by_parent: HashMap<IssueKey, Vec<IssueKey>>,
    /// Keys of issues that require a parent but have none resolvable.
    pub unlinked: HashSet<IssueKey>,
    /// When the run that produced this snapshot completed.
    pub fetched_at: DateTime<Utc>,
    /// Date window the run covered.
    pub date_range: DateWindow,
}

impl HierarchySnapshot {
    /// Number of issues in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues_by_key.len()
    }

    /// Whether the snapshot holds no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues_by_key.is_empty()
    }

    /// Whether the issue with `key` is unlinked.
    #[must_use]
    pub fn is_unlinked(&self, key: &IssueKey) -> bool {
        self.unlinked.contains(key)
    }

    /// Child issues of `key`, in first-seen order.
    #[must_use]
    pub fn children_of(&self, key: &IssueKey) -> Vec<&Issue> {
        self.children_by_parent
            .get(key)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| self.issues_by_key.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Filter and sort the snapshot's issues.
    ///
    /// The sort is stable with ties broken by key ascending regardless
    /// of `order`, so equal-valued rows always come out in the same
    /// sequence.
    #[must_use]
    pub fn select(&self, filter: &IssueFilter, key: SortKey, order: SortOrder) -> Vec<Issue> {
        let mut selected: Vec<&Issue> = self
            .issues_by_key
            .values()
            .filter(|issue| filter.matches(issue, self))
            .collect();

        selected.sort_by(|a, b| {
            let primary = key.compare(a, b);
            let primary = match order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| a.key.cmp(&b.key))
        });

        selected.into_iter().cloned().collect()
    }
}

/// Filter predicate for snapshot queries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    /// Keep only issues of this type.
    pub issue_type: Option<IssueType>,
    /// Keep only issues with exactly this status.
    pub status: Option<String>,
    /// Keep only unlinked issues.
    pub unlinked_only: bool,
}

impl IssueFilter {
    /// A filter that matches every issue.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    fn matches(&self, issue: &Issue, snapshot: &HierarchySnapshot) -> bool {
        if let Some(issue_type) = &self.issue_type
            && issue.issue_type != *issue_type
        {
            return false;
        }
        if let Some(status) = &self.status
            && issue.status != *status
        {
            return false;
        }
        if self.unlinked_only && !snapshot.is_unlinked(&issue.key) {
            return false;
        }
        true
    }
}

/// Whitelisted sort fields for snapshot queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Issue key, lexicographic.
    Key,
    /// Summary text, lexicographic.
    Summary,
    /// Status name, lexicographic.
    Status,
    /// Creation timestamp.
    CreatedAt,
    /// Last-update timestamp.
    UpdatedAt,
}

impl SortKey {
    fn compare(self, a: &Issue, b: &Issue) -> Ordering {
        match self {
            Self::Key => a.key.cmp(&b.key),
            Self::Summary => a.summary.cmp(&b.summary),
            Self::Status => a.status.cmp(&b.status),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

/// Sort direction for snapshot queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}
