//! Tunables shared by the fetchers and the coordinator.

use std::time::Duration;

use crate::github::gateway::PullRequestState;

/// Default pause between serial item fetches.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1000);

/// Default deadline for one outbound call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default GraphQL page size.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default number of concurrent augmentation lookups.
pub const DEFAULT_AUGMENTATION_WORKERS: usize = 4;

/// Which fetcher performs a full fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Page-at-a-time GraphQL queries plus check-run augmentation.
    #[default]
    Bulk,
    /// One REST item at a time with checkpointing after each.
    Paginated,
}

impl FetchStrategy {
    /// Lowercase name used in configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Paginated => "paginated",
        }
    }
}

/// Runtime settings for a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Pause after each serial item fetch.
    pub request_delay: Duration,
    /// Deadline for each outbound call.
    pub request_timeout: Duration,
    /// Nodes requested per GraphQL page.
    pub page_size: u32,
    /// Concurrent check-run lookups during augmentation.
    pub augmentation_workers: usize,
    /// State filter applied to listings and queries.
    pub state: PullRequestState,
    /// Whether draft pull requests are fetched.
    pub include_drafts: bool,
    /// Fetcher used for full fetches.
    pub strategy: FetchStrategy,
    /// Whether the coordinator probes the repository modification marker.
    pub probe_repository_changes: bool,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            augmentation_workers: DEFAULT_AUGMENTATION_WORKERS,
            state: PullRequestState::All,
            include_drafts: true,
            strategy: FetchStrategy::Bulk,
            probe_repository_changes: true,
        }
    }
}
