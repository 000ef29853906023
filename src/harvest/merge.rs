//! Incremental merge of freshly fetched records into a cached dataset.
//!
//! Records are keyed by `(repository, number)`. The incoming copy always
//! wins, cached records the incremental query did not touch are retained,
//! and the result is ordered most recently updated first.

use std::collections::HashSet;

use crate::github::models::PullRequestRecord;

use super::outcome::sort_most_recent_first;

/// Result of merging incoming records with cached records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Merged records, most recently updated first.
    pub records: Vec<PullRequestRecord>,
    /// Incoming records with no cached counterpart.
    pub added: usize,
    /// Cached records replaced by an incoming copy.
    pub updated: usize,
    /// Cached records kept unchanged.
    pub retained: usize,
}

/// Merges incoming records into cached records by identity.
///
/// # Examples
///
/// ```
/// use prharvest::github::models::test_support::{record_updated_at};
/// use prharvest::harvest::merge_records;
///
/// let cached = vec![
///     record_updated_at("octo/repo", 1, "2025-01-01T00:00:00Z"),
///     record_updated_at("octo/repo", 2, "2025-01-01T00:00:00Z"),
/// ];
/// let incoming = vec![
///     record_updated_at("octo/repo", 1, "2025-02-01T00:00:00Z"),
///     record_updated_at("octo/repo", 3, "2025-02-01T00:00:00Z"),
/// ];
///
/// let result = merge_records(cached, incoming);
/// assert_eq!(result.records.len(), 3);
/// assert_eq!(result.added, 1);
/// assert_eq!(result.updated, 1);
/// assert_eq!(result.retained, 1);
/// ```
#[must_use]
pub fn merge_records(
    cached: Vec<PullRequestRecord>,
    incoming: Vec<PullRequestRecord>,
) -> MergeResult {
    let cached_ids: HashSet<(String, u64)> = cached.iter().map(owned_identity).collect();
    let mut incoming_ids: HashSet<(String, u64)> = HashSet::with_capacity(incoming.len());

    // A repeated identity within one batch keeps its first (newest) copy.
    let mut records: Vec<PullRequestRecord> = Vec::with_capacity(cached.len() + incoming.len());
    for record in incoming {
        if incoming_ids.insert(owned_identity(&record)) {
            records.push(record);
        }
    }

    let added = incoming_ids.difference(&cached_ids).count();
    let updated = incoming_ids.intersection(&cached_ids).count();

    let retained_records: Vec<PullRequestRecord> = cached
        .into_iter()
        .filter(|record| !incoming_ids.contains(&owned_identity(record)))
        .collect();
    let retained = retained_records.len();
    records.extend(retained_records);

    sort_most_recent_first(&mut records);

    MergeResult {
        records,
        added,
        updated,
        retained,
    }
}

fn owned_identity(record: &PullRequestRecord) -> (String, u64) {
    let (repository, number) = record.identity();
    (repository.to_owned(), number)
}
