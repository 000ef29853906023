//! Test helpers for constructing `PullRequestRecord` fixtures.
//!
//! # Examples
//!
//! ```
//! use prharvest::github::models::test_support::{record, record_updated_at};
//!
//! let plain = record("octo/repo", 1);
//! let touched = record_updated_at("octo/repo", 2, "2025-03-01T00:00:00Z");
//! assert!(touched.updated_at > plain.updated_at);
//! ```

use chrono::{DateTime, TimeZone, Utc};

use super::{CheckRunRecord, CommitRecord, PullRequestRecord, PullRequestSummary, RecordState};

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// Constructs a minimal open record created and updated on 2024-01-01.
#[must_use]
pub fn record(repository: &str, number: u64) -> PullRequestRecord {
    PullRequestRecord {
        repository: repository.to_owned(),
        number,
        title: format!("Pull request {number}"),
        body: None,
        state: RecordState::Open,
        is_draft: false,
        created_at: epoch(),
        updated_at: epoch(),
        merged_at: None,
        closed_at: None,
        additions: 0,
        deletions: 0,
        changed_files: 0,
        author: Some("alice".to_owned()),
        labels: Vec::new(),
        milestone: None,
        assignees: Vec::new(),
        base_ref: Some("main".to_owned()),
        head_ref: None,
        head_sha: None,
        linked_issues: Vec::new(),
        commits: Vec::new(),
        reviews: Vec::new(),
        files: Vec::new(),
        check_runs: Vec::new(),
    }
}

/// Constructs a record whose `updated_at` is the given RFC 3339 timestamp.
///
/// An unparsable timestamp leaves the default 2024-01-01 value in place.
#[must_use]
pub fn record_updated_at(repository: &str, number: u64, updated_at: &str) -> PullRequestRecord {
    let mut value = record(repository, number);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(updated_at) {
        value.updated_at = parsed.with_timezone(&Utc);
    }
    value
}

/// Constructs a record with a single commit whose SHA is `sha`.
#[must_use]
pub fn record_with_commit(repository: &str, number: u64, sha: &str) -> PullRequestRecord {
    let mut value = record(repository, number);
    value.commits.push(CommitRecord {
        sha: sha.to_owned(),
        message: format!("Commit {sha}"),
        author_login: Some("alice".to_owned()),
        author_name: Some("Alice".to_owned()),
        committed_at: Some(epoch()),
        additions: None,
        deletions: None,
    });
    value
}

/// Constructs a listing summary whose `updated_at` is the given RFC 3339
/// timestamp.
#[must_use]
pub fn summary_updated_at(number: u64, updated_at: &str) -> PullRequestSummary {
    let updated = DateTime::parse_from_rfc3339(updated_at)
        .map_or_else(|_| epoch(), |parsed| parsed.with_timezone(&Utc));
    PullRequestSummary {
        number,
        title: Some(format!("Pull request {number}")),
        state: Some("open".to_owned()),
        is_draft: false,
        author: Some("alice".to_owned()),
        created_at: epoch(),
        updated_at: updated,
    }
}

/// Constructs a successful check run against `sha`.
#[must_use]
pub fn check_run(id: u64, sha: &str) -> CheckRunRecord {
    CheckRunRecord {
        id,
        name: format!("check-{id}"),
        status: "completed".to_owned(),
        conclusion: Some("success".to_owned()),
        head_sha: Some(sha.to_owned()),
        started_at: Some(epoch()),
        completed_at: Some(epoch()),
    }
}
