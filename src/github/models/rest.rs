//! REST deserialisation targets and their conversions into records.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{
    CheckRunRecord, CommitRecord, FileChangeRecord, PullRequestRecord, PullRequestSummary,
    RecordState, ReviewRecord, linked_issue_numbers,
};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiLabel {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMilestone {
    pub(crate) title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitRef {
    #[serde(rename = "ref")]
    pub(crate) name: Option<String>,
    pub(crate) sha: Option<String>,
}

/// API response type for PR listing.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequestSummary {
    pub(crate) number: u64,
    pub(crate) title: Option<String>,
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) draft: Option<bool>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// API response type for a single pull request.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) number: u64,
    pub(crate) title: Option<String>,
    pub(crate) body: Option<String>,
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) draft: Option<bool>,
    pub(crate) user: Option<ApiUser>,
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
    #[serde(default)]
    pub(crate) labels: Vec<ApiLabel>,
    pub(crate) milestone: Option<ApiMilestone>,
    #[serde(default)]
    pub(crate) assignees: Vec<ApiUser>,
    pub(crate) base: Option<ApiGitRef>,
    pub(crate) head: Option<ApiGitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitActor {
    pub(crate) name: Option<String>,
    pub(crate) date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitDetail {
    #[serde(default)]
    pub(crate) message: String,
    pub(crate) author: Option<ApiGitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitStats {
    pub(crate) additions: Option<u64>,
    pub(crate) deletions: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommit {
    pub(crate) sha: String,
    pub(crate) commit: ApiCommitDetail,
    pub(crate) author: Option<ApiUser>,
    pub(crate) stats: Option<ApiCommitStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReview {
    pub(crate) id: u64,
    pub(crate) user: Option<ApiUser>,
    #[serde(default)]
    pub(crate) state: String,
    pub(crate) body: Option<String>,
    pub(crate) submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiFile {
    pub(crate) filename: String,
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) additions: u64,
    #[serde(default)]
    pub(crate) deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCheckRun {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) status: String,
    pub(crate) conclusion: Option<String>,
    pub(crate) head_sha: Option<String>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCheckRuns {
    #[serde(default)]
    pub(crate) check_runs: Vec<ApiCheckRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRepository {
    pub(crate) pushed_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl ApiRepository {
    /// Latest of `pushed_at` and `updated_at`; either moves when new pull
    /// request activity lands.
    pub(crate) fn modified_at(&self) -> Option<DateTime<Utc>> {
        match (self.pushed_at, self.updated_at) {
            (Some(pushed), Some(updated)) => Some(pushed.max(updated)),
            (pushed, updated) => pushed.or(updated),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRate {
    pub(crate) limit: u64,
    pub(crate) remaining: u64,
    pub(crate) reset: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRateLimit {
    pub(crate) rate: ApiRate,
}

/// Sub-resources fetched alongside a pull request's detail.
#[derive(Debug, Clone, Default)]
pub(crate) struct RestSubResources {
    pub(crate) commits: Vec<ApiCommit>,
    pub(crate) reviews: Vec<ApiReview>,
    pub(crate) files: Vec<ApiFile>,
    pub(crate) check_runs: Vec<ApiCheckRun>,
}

fn login(user: Option<ApiUser>) -> Option<String> {
    user.and_then(|value| value.login)
}

impl From<ApiPullRequestSummary> for PullRequestSummary {
    fn from(value: ApiPullRequestSummary) -> Self {
        Self {
            number: value.number,
            title: value.title,
            state: value.state,
            is_draft: value.draft.unwrap_or(false),
            author: login(value.user),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<ApiCommit> for CommitRecord {
    fn from(value: ApiCommit) -> Self {
        let (author_name, committed_at) = value
            .commit
            .author
            .map_or((None, None), |actor| (actor.name, actor.date));
        let (additions, deletions) = value
            .stats
            .map_or((None, None), |stats| (stats.additions, stats.deletions));
        Self {
            sha: value.sha,
            message: value.commit.message,
            author_login: login(value.author),
            author_name,
            committed_at,
            additions,
            deletions,
        }
    }
}

impl From<ApiReview> for ReviewRecord {
    fn from(value: ApiReview) -> Self {
        Self {
            id: value.id,
            reviewer: login(value.user),
            state: value.state,
            body: value.body,
            submitted_at: value.submitted_at,
        }
    }
}

impl From<ApiFile> for FileChangeRecord {
    fn from(value: ApiFile) -> Self {
        Self {
            path: value.filename,
            status: value.status,
            additions: value.additions,
            deletions: value.deletions,
        }
    }
}

impl From<ApiCheckRun> for CheckRunRecord {
    fn from(value: ApiCheckRun) -> Self {
        Self {
            id: value.id,
            name: value.name,
            status: value.status,
            conclusion: value.conclusion,
            head_sha: value.head_sha,
            started_at: value.started_at,
            completed_at: value.completed_at,
        }
    }
}

impl ApiPullRequest {
    pub(crate) fn into_record(
        self,
        repository: &str,
        sub_resources: RestSubResources,
    ) -> PullRequestRecord {
        let state = match (self.merged_at, self.state.as_deref()) {
            (Some(_), _) => RecordState::Merged,
            (None, Some("closed")) => RecordState::Closed,
            (None, _) => RecordState::Open,
        };
        let linked_issues = self
            .body
            .as_deref()
            .map(linked_issue_numbers)
            .unwrap_or_default();
        let (base_ref, _) = split_ref(self.base);
        let (head_ref, head_sha) = split_ref(self.head);

        PullRequestRecord {
            repository: repository.to_owned(),
            number: self.number,
            title: self.title.unwrap_or_default(),
            body: self.body,
            state,
            is_draft: self.draft.unwrap_or(false),
            created_at: self.created_at,
            updated_at: self.updated_at,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            additions: self.additions,
            deletions: self.deletions,
            changed_files: self.changed_files,
            author: login(self.user),
            labels: self
                .labels
                .into_iter()
                .filter_map(|label| label.name)
                .collect(),
            milestone: self.milestone.and_then(|milestone| milestone.title),
            assignees: self
                .assignees
                .into_iter()
                .filter_map(|assignee| assignee.login)
                .collect(),
            base_ref,
            head_ref,
            head_sha,
            linked_issues,
            commits: sub_resources.commits.into_iter().map(Into::into).collect(),
            reviews: sub_resources.reviews.into_iter().map(Into::into).collect(),
            files: sub_resources.files.into_iter().map(Into::into).collect(),
            check_runs: sub_resources
                .check_runs
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

fn split_ref(git_ref: Option<ApiGitRef>) -> (Option<String>, Option<String>) {
    git_ref.map_or((None, None), |value| (value.name, value.sha))
}
