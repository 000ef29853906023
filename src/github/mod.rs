//! GitHub access: credentials, the HTTP gateway and the record model.
//!
//! This module wraps Octocrab to list and load pull requests over REST,
//! page through them with GraphQL, and classify GitHub's two kinds of
//! throttling. Errors are mapped into [`IntakeError`] variants so callers
//! can react to rate limits without seeing Octocrab internals.

pub mod credential_pool;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;

pub use credential_pool::{Credential, CredentialId, CredentialPool};
pub use error::IntakeError;
pub use gateway::{HistoryGateway, OctocrabGateway, PullRequestState};
pub use locator::{PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner};
pub use models::{PullRequestRecord, RecordState};
pub use pagination::{CursorState, PageInfo};
pub use rate_limit::RateLimitInfo;

#[cfg(test)]
pub use gateway::MockHistoryGateway;

#[cfg(test)]
mod tests;
