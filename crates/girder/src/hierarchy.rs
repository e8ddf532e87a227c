//! Parent/child resolution and unlinked classification.
//!
//! Resolution is a single linear pass plus one lookup per issue: parent
//! references are exactly one level, so no traversal or cycle detection
//! is needed and reference cycles are harmless. The pass is
//! order-independent for classification and uses fetch order only to
//! keep `children_by_parent` sequences in first-seen order.

use crate::error::RunWarning;
use crate::model::{Issue, IssueKey};
use crate::snapshot::HierarchySnapshot;
use chrono::Utc;
use girder_client::page::DateWindow;
use std::collections::{HashMap, HashSet};

/// Build a resolved snapshot from the complete issue set of one run.
///
/// - Duplicate keys keep the first-seen record; a duplicate with
///   differing content adds a [`RunWarning::DuplicateKey`] (an identical
///   duplicate is silent).
/// - A child is attached to `children_by_parent` only when its parent
///   exists in the set and the type pairing is valid.
/// - An issue is unlinked iff its type requires a parent and the parent
///   reference is unset, unresolvable, or type-invalid. Epics and
///   `Other`-typed issues are never unlinked.
///
/// Resolving the same complete set twice yields identical results.
#[must_use]
pub fn resolve(
    issues: Vec<Issue>,
    date_range: DateWindow,
) -> (HierarchySnapshot, Vec<RunWarning>) {
    let mut warnings = Vec::new();

    // Pass 1: index by key, first-seen wins. `order` remembers fetch
    // order of the kept records for deterministic child sequences.
    let mut issues_by_key: HashMap<IssueKey, Issue> = HashMap::with_capacity(issues.len());
    let mut order: Vec<IssueKey> = Vec::with_capacity(issues.len());
    for issue in issues {
        match issues_by_key.get(&issue.key) {
            None => {
                order.push(issue.key.clone());
                issues_by_key.insert(issue.key.clone(), issue);
            }
            Some(existing) => {
                // Correct pagination never produces duplicates; only a
                // content mismatch is worth surfacing.
                if *existing != issue {
                    tracing::warn!(key = %issue.key, "duplicate key with differing content");
                    warnings.push(RunWarning::DuplicateKey {
                        key: issue.key.to_string(),
                    });
                }
            }
        }
    }

    // Pass 2: one lookup per issue.
    let mut children_by_parent: HashMap<IssueKey, Vec<IssueKey>> = HashMap::new();
    let mut unlinked: HashSet<IssueKey> = HashSet::new();
    for key in &order {
        let issue = &issues_by_key[key];
        let resolved_parent = issue.parent_key.as_ref().and_then(|parent_key| {
            issues_by_key
                .get(parent_key)
                .filter(|parent| parent.issue_type.is_valid_parent_of(&issue.issue_type))
                .map(|_| parent_key)
        });

        if let Some(parent_key) = resolved_parent {
            children_by_parent
                .entry(parent_key.clone())
                .or_default()
                .push(key.clone());
        } else if issue.issue_type.requires_parent() {
            unlinked.insert(key.clone());
        }
    }

    let snapshot = HierarchySnapshot {
        issues_by_key,
        children_by_parent,
        unlinked,
        fetched_at: Utc::now(),
        date_range,
    };
    (snapshot, warnings)
}
