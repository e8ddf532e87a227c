//! Property tests for hierarchy resolution.
//!
//! Issue sets are generated over a small key pool so duplicate keys,
//! dangling parents, self references, and reference cycles all occur
//! naturally.

use girder::hierarchy::resolve;
use girder::model::{Issue, IssueKey, IssueType};
use girder_client::page::DateWindow;
use proptest::prelude::*;
use std::collections::HashMap;

fn window() -> DateWindow {
    DateWindow::new(
        "2024-01-01".parse().unwrap(),
        "2024-03-31".parse().unwrap(),
    )
}

fn issue_type_strategy() -> impl Strategy<Value = IssueType> {
    prop_oneof![
        Just(IssueType::Epic),
        Just(IssueType::Story),
        Just(IssueType::Task),
        Just(IssueType::Subtask),
        Just(IssueType::Other("Bug".to_string())),
    ]
}

/// Issues over an eight-key pool; parent indices above the pool size
/// produce dangling references.
fn issue_strategy() -> impl Strategy<Value = Issue> {
    (0usize..8, issue_type_strategy(), proptest::option::of(0usize..12)).prop_map(
        |(key_idx, issue_type, parent_idx)| Issue {
            key: IssueKey::new(format!("K{key_idx}")),
            issue_type,
            summary: String::new(),
            status: "Open".to_string(),
            created_at: chrono::DateTime::UNIX_EPOCH,
            updated_at: chrono::DateTime::UNIX_EPOCH,
            parent_key: parent_idx.map(|idx| IssueKey::new(format!("K{idx}"))),
            raw_attributes: HashMap::new(),
        },
    )
}

fn issue_set() -> impl Strategy<Value = Vec<Issue>> {
    proptest::collection::vec(issue_strategy(), 0..24)
}

proptest! {
    #[test]
    fn an_issue_is_unlinked_iff_no_valid_parent_resolves(issues in issue_set()) {
        let (snapshot, _) = resolve(issues, window());

        for (key, issue) in &snapshot.issues_by_key {
            let valid_parent = issue.parent_key.as_ref().is_some_and(|parent_key| {
                snapshot
                    .issues_by_key
                    .get(parent_key)
                    .is_some_and(|parent| {
                        parent.issue_type.is_valid_parent_of(&issue.issue_type)
                    })
            });
            let expected = issue.issue_type.requires_parent() && !valid_parent;
            prop_assert_eq!(snapshot.unlinked.contains(key), expected);
        }
    }

    #[test]
    fn children_entries_are_exactly_the_valid_pairings(issues in issue_set()) {
        let (snapshot, _) = resolve(issues, window());

        let mut attached = 0;
        for (parent_key, children) in &snapshot.children_by_parent {
            let parent = &snapshot.issues_by_key[parent_key];
            for child_key in children {
                let child = &snapshot.issues_by_key[child_key];
                prop_assert_eq!(child.parent_key.as_ref(), Some(parent_key));
                prop_assert!(parent.issue_type.is_valid_parent_of(&child.issue_type));
                prop_assert!(!snapshot.unlinked.contains(child_key));
                attached += 1;
            }
        }

        // Every issue with a valid resolvable parent appears exactly once.
        let expected = snapshot
            .issues_by_key
            .values()
            .filter(|issue| {
                issue.parent_key.as_ref().is_some_and(|parent_key| {
                    snapshot.issues_by_key.get(parent_key).is_some_and(|parent| {
                        parent.issue_type.is_valid_parent_of(&issue.issue_type)
                    })
                })
            })
            .count();
        prop_assert_eq!(attached, expected);
    }

    #[test]
    fn resolution_is_idempotent(issues in issue_set()) {
        let (first, _) = resolve(issues.clone(), window());
        let (second, _) = resolve(issues, window());

        prop_assert_eq!(first.unlinked, second.unlinked);
        prop_assert_eq!(first.children_by_parent, second.children_by_parent);
        prop_assert_eq!(
            first.issues_by_key.keys().len(),
            second.issues_by_key.keys().len()
        );
    }

    #[test]
    fn epics_and_other_types_are_never_unlinked(issues in issue_set()) {
        let (snapshot, _) = resolve(issues, window());

        for (key, issue) in &snapshot.issues_by_key {
            if matches!(issue.issue_type, IssueType::Epic | IssueType::Other(_)) {
                prop_assert!(!snapshot.unlinked.contains(key));
            }
        }
    }
}
