//! GraphQL payload mapping for the bulk pull request query.
//!
//! GitHub returns `null` for connections and nodes it cannot resolve (for
//! example a deleted author). Every nested collection here decodes `null`
//! or a missing field as empty so a partial node still maps to a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::{
    CommitRecord, FileChangeRecord, PullRequestRecord, RecordState, ReviewRecord,
    linked_issue_numbers,
};

fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level GraphQL envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub(crate) data: Option<T>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
}

impl GraphQlError {
    pub(crate) fn is_rate_limited(&self) -> bool {
        self.kind.as_deref() == Some("RATE_LIMITED")
    }
}

/// A list of nodes that may itself be null or contain null entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Nodes<T> {
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) nodes: Vec<Option<T>>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Nodes<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        self.nodes.into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestPageData {
    pub(crate) repository: Option<GqlRepository>,
    pub(crate) rate_limit: Option<GqlRateLimit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlRateLimit {
    pub(crate) remaining: u32,
    pub(crate) limit: Option<u32>,
    pub(crate) reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlRepository {
    pub(crate) pull_requests: GqlPullRequestConnection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlPullRequestConnection {
    pub(crate) page_info: GqlPageInfo,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) nodes: Vec<Option<GqlPullRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlPageInfo {
    #[serde(default)]
    pub(crate) has_next_page: bool,
    pub(crate) end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlActor {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlNamed {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlTitled {
    pub(crate) title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlIssueReference {
    pub(crate) number: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlPullRequest {
    pub(crate) number: u64,
    #[serde(default)]
    pub(crate) title: String,
    pub(crate) body: Option<String>,
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) is_draft: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
    pub(crate) closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) additions: u64,
    #[serde(default)]
    pub(crate) deletions: u64,
    #[serde(default)]
    pub(crate) changed_files: u64,
    pub(crate) author: Option<GqlActor>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) labels: Nodes<GqlNamed>,
    pub(crate) milestone: Option<GqlTitled>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) assignees: Nodes<GqlActor>,
    pub(crate) base_ref_name: Option<String>,
    pub(crate) head_ref_name: Option<String>,
    pub(crate) head_ref_oid: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) closing_issues_references: Nodes<GqlIssueReference>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) commits: Nodes<GqlCommitNode>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) reviews: Nodes<GqlReview>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub(crate) files: Nodes<GqlFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlCommitNode {
    pub(crate) commit: GqlCommit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlCommit {
    pub(crate) oid: String,
    #[serde(default)]
    pub(crate) message: String,
    pub(crate) committed_date: Option<DateTime<Utc>>,
    pub(crate) additions: Option<u64>,
    pub(crate) deletions: Option<u64>,
    pub(crate) author: Option<GqlGitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GqlGitActor {
    pub(crate) name: Option<String>,
    pub(crate) user: Option<GqlActor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlReview {
    pub(crate) database_id: Option<u64>,
    pub(crate) author: Option<GqlActor>,
    #[serde(default)]
    pub(crate) state: String,
    pub(crate) body: Option<String>,
    pub(crate) submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlFile {
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) additions: u64,
    #[serde(default)]
    pub(crate) deletions: u64,
    pub(crate) change_type: Option<String>,
}

fn actor_login(actor: Option<GqlActor>) -> Option<String> {
    actor.and_then(|value| value.login)
}

impl From<GqlCommitNode> for CommitRecord {
    fn from(value: GqlCommitNode) -> Self {
        let commit = value.commit;
        let (author_name, author_login) = commit
            .author
            .map_or((None, None), |actor| (actor.name, actor_login(actor.user)));
        Self {
            sha: commit.oid,
            message: commit.message,
            author_login,
            author_name,
            committed_at: commit.committed_date,
            additions: commit.additions,
            deletions: commit.deletions,
        }
    }
}

impl From<GqlFile> for FileChangeRecord {
    fn from(value: GqlFile) -> Self {
        Self {
            path: value.path,
            status: value
                .change_type
                .map(|kind| kind.to_lowercase())
                .unwrap_or_default(),
            additions: value.additions,
            deletions: value.deletions,
        }
    }
}

impl GqlPullRequest {
    pub(crate) fn into_record(self, repository: &str) -> PullRequestRecord {
        let state = match self.state.as_deref() {
            Some("MERGED") => RecordState::Merged,
            Some("CLOSED") => RecordState::Closed,
            _ if self.merged_at.is_some() => RecordState::Merged,
            _ => RecordState::Open,
        };

        let mut linked_issues: Vec<u64> = self
            .closing_issues_references
            .into_vec()
            .into_iter()
            .map(|reference| reference.number)
            .collect();
        if linked_issues.is_empty() {
            linked_issues = self
                .body
                .as_deref()
                .map(linked_issue_numbers)
                .unwrap_or_default();
        } else {
            linked_issues.sort_unstable();
            linked_issues.dedup();
        }

        let reviews = self
            .reviews
            .into_vec()
            .into_iter()
            .filter_map(|review| {
                review.database_id.map(|id| ReviewRecord {
                    id,
                    reviewer: actor_login(review.author),
                    state: review.state,
                    body: review.body,
                    submitted_at: review.submitted_at,
                })
            })
            .collect();

        PullRequestRecord {
            repository: repository.to_owned(),
            number: self.number,
            title: self.title,
            body: self.body,
            state,
            is_draft: self.is_draft,
            created_at: self.created_at,
            updated_at: self.updated_at,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            additions: self.additions,
            deletions: self.deletions,
            changed_files: self.changed_files,
            author: actor_login(self.author),
            labels: self
                .labels
                .into_vec()
                .into_iter()
                .filter_map(|label| label.name)
                .collect(),
            milestone: self.milestone.and_then(|milestone| milestone.title),
            assignees: self
                .assignees
                .into_vec()
                .into_iter()
                .filter_map(|assignee| assignee.login)
                .collect(),
            base_ref: self.base_ref_name,
            head_ref: self.head_ref_name,
            head_sha: self.head_ref_oid,
            linked_issues,
            commits: self.commits.into_vec().into_iter().map(Into::into).collect(),
            reviews,
            files: self.files.into_vec().into_iter().map(Into::into).collect(),
            check_runs: Vec::new(),
        }
    }
}
