//! Octocrab-backed implementation of [`HistoryGateway`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;

use crate::github::credential_pool::Credential;
use crate::github::error::IntakeError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::{CheckRunRecord, PullRequestRecord};
use crate::github::rate_limit::RateLimitInfo;

use super::client::ClientCache;
use super::{
    BulkQuery, HistoryGateway, ListPullRequestsParams, PaginatedPullRequests, PullRequestPage,
    graphql, rest,
};

/// Octocrab-backed gateway serving every credential in a pool.
///
/// One Octocrab client is built per credential the first time it is used
/// and reused afterwards.
pub struct OctocrabGateway {
    api_base: String,
    clients: ClientCache,
}

impl OctocrabGateway {
    /// Creates a gateway talking to the API base of `locator`.
    #[must_use]
    pub fn new(locator: &RepositoryLocator) -> Self {
        Self::for_api_base(locator.api_base().as_str())
    }

    /// Creates a gateway talking to an explicit API base URL.
    #[must_use]
    pub fn for_api_base(api_base: &str) -> Self {
        Self {
            api_base: api_base.to_owned(),
            clients: ClientCache::default(),
        }
    }

    fn client(&self, credential: &Credential) -> Result<Octocrab, IntakeError> {
        self.clients.client_for(credential, &self.api_base)
    }
}

#[async_trait]
impl HistoryGateway for OctocrabGateway {
    async fn list_pull_requests(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        params: &ListPullRequestsParams,
    ) -> Result<PaginatedPullRequests, IntakeError> {
        let client = self.client(credential)?;
        rest::list_pull_requests(&client, locator, params).await
    }

    async fn pull_request_history(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        number: u64,
    ) -> Result<PullRequestRecord, IntakeError> {
        let client = self.client(credential)?;
        rest::pull_request_history(&client, locator, number).await
    }

    async fn check_runs(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        sha: &str,
    ) -> Result<Vec<CheckRunRecord>, IntakeError> {
        let client = self.client(credential)?;
        rest::check_runs(&client, locator, sha).await
    }

    async fn pull_request_page(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        query: &BulkQuery,
    ) -> Result<PullRequestPage, IntakeError> {
        let client = self.client(credential)?;
        graphql::pull_request_page(&client, locator, query).await
    }

    async fn repository_modified_at(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
    ) -> Result<Option<DateTime<Utc>>, IntakeError> {
        let client = self.client(credential)?;
        rest::repository_modified_at(&client, locator).await
    }

    async fn rate_limit(&self, credential: &Credential) -> Result<RateLimitInfo, IntakeError> {
        let client = self.client(credential)?;
        rest::rate_limit(&client).await
    }
}
