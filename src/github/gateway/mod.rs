//! Gateways for loading pull request history from GitHub.
//!
//! [`HistoryGateway`] is the only seam through which the pipeline reaches
//! the network. Every method takes the [`Credential`] to authenticate with
//! so the credential pool, not the gateway, decides which token is spent.
//! [`OctocrabGateway`] is the production implementation; tests substitute
//! `MockHistoryGateway`.

mod client;
mod error_mapping;
mod graphql;
mod history;
mod http_utils;
mod rest;

pub use history::OctocrabGateway;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::github::credential_pool::Credential;
use crate::github::error::IntakeError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::{CheckRunRecord, PullRequestRecord, PullRequestSummary};
use crate::github::pagination::{CursorState, PageInfo};
use crate::github::rate_limit::RateLimitInfo;

/// Largest page size GitHub accepts for REST listings.
pub const MAX_REST_PAGE_SIZE: u8 = 100;

/// Largest page size GitHub accepts for a GraphQL connection.
pub const MAX_GRAPHQL_PAGE_SIZE: u32 = 100;

/// Pull request state filter for listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullRequestState {
    /// Only open pull requests.
    Open,
    /// Only closed (including merged) pull requests.
    Closed,
    /// All pull requests regardless of state.
    #[default]
    All,
}

impl PullRequestState {
    /// Returns the REST parameter value for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }

    /// Returns the GraphQL `states` argument for this filter.
    #[must_use]
    pub const fn graphql_states(&self) -> &'static [&'static str] {
        match self {
            Self::Open => &["OPEN"],
            Self::Closed => &["CLOSED", "MERGED"],
            Self::All => &["OPEN", "CLOSED", "MERGED"],
        }
    }
}

/// Parameters for listing pull requests, newest update first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPullRequestsParams {
    /// Filter by state.
    pub state: PullRequestState,
    /// Page number to fetch (1-based).
    pub page: u32,
    /// Items per page (1 to 100).
    pub per_page: u8,
}

impl Default for ListPullRequestsParams {
    fn default() -> Self {
        Self {
            state: PullRequestState::All,
            page: 1,
            per_page: MAX_REST_PAGE_SIZE,
        }
    }
}

/// One page of a REST pull request listing.
#[derive(Debug, Clone)]
pub struct PaginatedPullRequests {
    /// Pull request summaries on this page.
    pub items: Vec<PullRequestSummary>,
    /// Pagination state.
    pub page_info: PageInfo,
    /// Quota reported with the response.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Field a bulk query orders results by, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOrdering {
    /// Newest created first; used for full fetches.
    CreatedAt,
    /// Most recently updated first; used for incremental fetches.
    UpdatedAt,
}

impl BulkOrdering {
    /// GraphQL `IssueOrderField` value.
    #[must_use]
    pub const fn as_graphql(&self) -> &'static str {
        match self {
            Self::CreatedAt => "CREATED_AT",
            Self::UpdatedAt => "UPDATED_AT",
        }
    }

    /// Reads the ordering field from a record.
    #[must_use]
    pub const fn timestamp_of(&self, record: &PullRequestRecord) -> DateTime<Utc> {
        match self {
            Self::CreatedAt => record.created_at,
            Self::UpdatedAt => record.updated_at,
        }
    }
}

/// Arguments for one page of the bulk pull request query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkQuery {
    /// Number of nodes to request.
    pub first: u32,
    /// Continuation cursor from the previous page.
    pub after: Option<String>,
    /// Result ordering.
    pub ordering: BulkOrdering,
    /// State filter.
    pub state: PullRequestState,
}

/// One page of bulk query results.
#[derive(Debug, Clone)]
pub struct PullRequestPage {
    /// Records mapped from the page's nodes, in response order.
    pub records: Vec<PullRequestRecord>,
    /// Where the next page starts.
    pub cursor: CursorState,
    /// Quota reported in the response body.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Gateway that can load pull request history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryGateway: Send + Sync {
    /// List pull request summaries ordered by most recent update.
    async fn list_pull_requests(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        params: &ListPullRequestsParams,
    ) -> Result<PaginatedPullRequests, IntakeError>;

    /// Fetch one pull request with commits, reviews, files and the check
    /// runs of its head commit.
    async fn pull_request_history(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        number: u64,
    ) -> Result<PullRequestRecord, IntakeError>;

    /// Fetch the check runs reported for a commit.
    async fn check_runs(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        sha: &str,
    ) -> Result<Vec<CheckRunRecord>, IntakeError>;

    /// Fetch one page of the bulk pull request query.
    async fn pull_request_page(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        query: &BulkQuery,
    ) -> Result<PullRequestPage, IntakeError>;

    /// Fetch the instant the repository last changed.
    async fn repository_modified_at(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
    ) -> Result<Option<DateTime<Utc>>, IntakeError>;

    /// Fetch the credential's current primary quota.
    async fn rate_limit(&self, credential: &Credential) -> Result<RateLimitInfo, IntakeError>;
}

/// Number of REST calls [`HistoryGateway::pull_request_history`] makes.
pub const CALLS_PER_HISTORY: u32 = 5;

/// Runs a gateway call under a deadline, mapping expiry to
/// `IntakeError::Timeout`.
///
/// # Errors
///
/// Returns the call's own error, or `IntakeError::Timeout` when `limit`
/// elapses first.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, IntakeError>
where
    F: Future<Output = Result<T, IntakeError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| IntakeError::Timeout {
            operation: operation.to_owned(),
            seconds: limit.as_secs(),
        })?
}

#[cfg(test)]
mod tests;
