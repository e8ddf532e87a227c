//! Colored summary output for the `fetch` command.

use crate::model::{Issue, IssueType};
use crate::refresh::RefreshReport;
use colored::Colorize;
use std::collections::BTreeMap;

/// Per-type tallies: total issues and how many are unlinked.
#[derive(Debug, Default, Clone, Copy)]
struct TypeCounts {
    total: usize,
    unlinked: usize,
}

/// Stable display label for a type, grouping `Other` by source name.
fn type_label(issue_type: &IssueType) -> String {
    issue_type.to_string()
}

/// Print the run summary: totals, per-type counts with unlinked counts,
/// and any warnings.
pub(crate) fn print_report(report: &RefreshReport) {
    let snapshot = &report.snapshot;

    let mut counts: BTreeMap<String, TypeCounts> = BTreeMap::new();
    for issue in snapshot.issues_by_key.values() {
        let entry = counts.entry(type_label(&issue.issue_type)).or_default();
        entry.total += 1;
        if snapshot.is_unlinked(&issue.key) {
            entry.unlinked += 1;
        }
    }

    println!();
    println!(
        "{} {} issues ({})",
        "Fetched".bold(),
        snapshot.len().to_string().cyan(),
        snapshot.date_range
    );
    if report.cancelled {
        println!("{}", "Run was cancelled; results are partial.".yellow());
    }

    println!();
    for (label, tally) in &counts {
        let unlinked = if tally.unlinked > 0 {
            format!("{} unlinked", tally.unlinked).red().to_string()
        } else {
            "all linked".green().to_string()
        };
        println!("  {:<14} {:>5}   {unlinked}", label, tally.total);
    }

    if report.records_skipped > 0 {
        println!();
        println!(
            "{}",
            format!("Skipped {} malformed record(s).", report.records_skipped).yellow()
        );
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in &report.warnings {
            println!("  {}", warning.to_string().yellow());
        }
    }

    let examples = unlinked_examples(snapshot.issues_by_key.values(), snapshot);
    if !examples.is_empty() {
        println!();
        println!("{}", "Unlinked:".red().bold());
        for issue in &examples {
            println!(
                "  {} [{}] {}",
                issue.key.as_str().cyan(),
                issue.issue_type,
                issue.summary
            );
        }
        let shown = examples.len();
        let total = snapshot.unlinked.len();
        if total > shown {
            println!("  ... and {} more", total - shown);
        }
    }
}

/// Up to five unlinked issues for the summary footer, key-ascending.
fn unlinked_examples<'a>(
    issues: impl Iterator<Item = &'a Issue>,
    snapshot: &crate::snapshot::HierarchySnapshot,
) -> Vec<&'a Issue> {
    let mut unlinked: Vec<&Issue> = issues
        .filter(|issue| snapshot.is_unlinked(&issue.key))
        .collect();
    unlinked.sort_by(|a, b| a.key.cmp(&b.key));
    unlinked.truncate(5);
    unlinked
}
