//! Pull request history records produced by the pipeline.
//!
//! The public types here are what the pipeline hands to its consumers and
//! what the cache snapshot stores on disk. Types in the `rest` and `graphql`
//! submodules are deserialisation targets that convert into these records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) mod graphql;
mod linked_issues;
pub(crate) mod rest;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use linked_issues::linked_issue_numbers;

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Still open.
    #[default]
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into its base branch.
    Merged,
}

impl RecordState {
    /// Returns the lowercase label used in output and on disk.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

/// One pull request with its nested history.
///
/// Identity is `(repository, number)`; a snapshot never holds two records
/// with the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    #[serde(default)]
    pub title: String,
    /// Description body.
    #[serde(default)]
    pub body: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: RecordState,
    /// Whether the pull request is a draft.
    #[serde(default)]
    pub is_draft: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Merge timestamp.
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Close timestamp.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Lines added.
    #[serde(default)]
    pub additions: u64,
    /// Lines removed.
    #[serde(default)]
    pub deletions: u64,
    /// Number of files touched.
    #[serde(default)]
    pub changed_files: u64,
    /// Author login if present.
    #[serde(default)]
    pub author: Option<String>,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Milestone title.
    #[serde(default)]
    pub milestone: Option<String>,
    /// Assignee logins.
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Base branch name.
    #[serde(default)]
    pub base_ref: Option<String>,
    /// Head branch name.
    #[serde(default)]
    pub head_ref: Option<String>,
    /// SHA at the tip of the head branch.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Issues this pull request closes, ascending.
    #[serde(default)]
    pub linked_issues: Vec<u64>,
    /// Commits in the pull request, oldest first.
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    /// Submitted reviews.
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
    /// Changed files.
    #[serde(default)]
    pub files: Vec<FileChangeRecord>,
    /// Check runs reported against the most recent commit.
    #[serde(default)]
    pub check_runs: Vec<CheckRunRecord>,
}

impl PullRequestRecord {
    /// Returns the `(repository, number)` identity.
    #[must_use]
    pub fn identity(&self) -> (&str, u64) {
        (self.repository.as_str(), self.number)
    }

    /// SHA of the most recent commit, preferring the head ref tip.
    #[must_use]
    pub fn latest_commit_sha(&self) -> Option<&str> {
        self.head_sha
            .as_deref()
            .or_else(|| self.commits.last().map(|commit| commit.sha.as_str()))
    }
}

/// A commit inside a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit SHA.
    pub sha: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
    /// GitHub login of the author, when the email maps to an account.
    #[serde(default)]
    pub author_login: Option<String>,
    /// Git author name.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Commit timestamp.
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
    /// Lines added, when the API reports it.
    #[serde(default)]
    pub additions: Option<u64>,
    /// Lines removed, when the API reports it.
    #[serde(default)]
    pub deletions: Option<u64>,
}

/// A submitted review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Review identifier.
    pub id: u64,
    /// Reviewer login.
    #[serde(default)]
    pub reviewer: Option<String>,
    /// Review verdict, e.g. `APPROVED` or `CHANGES_REQUESTED`.
    #[serde(default)]
    pub state: String,
    /// Review body.
    #[serde(default)]
    pub body: Option<String>,
    /// Submission timestamp.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    /// Path of the file after the change.
    pub path: String,
    /// Change kind, e.g. `added`, `modified`, `removed`.
    #[serde(default)]
    pub status: String,
    /// Lines added.
    #[serde(default)]
    pub additions: u64,
    /// Lines removed.
    #[serde(default)]
    pub deletions: u64,
}

/// A CI check run reported for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunRecord {
    /// Check run identifier.
    pub id: u64,
    /// Check name.
    #[serde(default)]
    pub name: String,
    /// Execution status, e.g. `queued` or `completed`.
    #[serde(default)]
    pub status: String,
    /// Final conclusion once completed.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Commit the check ran against.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Start timestamp.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Lightweight pull request summary returned by REST listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: Option<String>,
    /// State as reported by the listing (`open` or `closed`).
    pub state: Option<String>,
    /// Whether the pull request is a draft.
    pub is_draft: bool,
    /// Author login if present.
    pub author: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests;
