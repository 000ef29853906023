//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prharvest.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRHARVEST_TOKENS`, `PRHARVEST_OWNER`, or
//!    legacy `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--tokens`/`-t`, `--owner`/`-o`, and so on
//!
//! # Configuration File
//!
//! ```toml
//! tokens = "ghp_first,ghp_second"
//! owner = "octocat"
//! repo = "hello-world"
//! since = "2025-01-01"
//! max_items = 500
//! strategy = "bulk"
//! cache_dir = ".prharvest/cache"
//! ```

use std::env;
use std::time::Duration;

use chrono::NaiveDate;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::error::IntakeError;
use crate::github::gateway::PullRequestState;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::harvest::{
    DEFAULT_AUGMENTATION_WORKERS, DEFAULT_PAGE_SIZE, FetchStrategy, HarvestSettings,
};

const DEFAULT_MAX_ITEMS: usize = 1000;
const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_CACHE_DIR: &str = ".prharvest/cache";
const DEFAULT_CHECKPOINT_DIR: &str = ".prharvest/checkpoints";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRHARVEST_TOKENS`, `GITHUB_TOKEN`, or `--tokens`: Comma-separated
///   personal access tokens
/// - `PRHARVEST_OWNER` or `--owner`: Repository owner
/// - `PRHARVEST_REPO` or `--repo`: Repository name
/// - `PRHARVEST_SINCE` or `--since`: Lower-bound date (`YYYY-MM-DD`)
///
/// # Example
///
/// ```no_run
/// use prharvest::HarvestConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = HarvestConfig::load().expect("failed to load configuration");
/// let tokens = config.resolve_tokens().expect("token required");
/// let since = config.since_date().expect("since date required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRHARVEST",
    discovery(
        dotfile_name = ".prharvest.toml",
        config_file_name = "prharvest.toml",
        app_name = "prharvest"
    )
)]
pub struct HarvestConfig {
    /// Personal access tokens, comma-separated.
    ///
    /// Can be provided via:
    /// - CLI: `--tokens <TOKENS>` or `-t <TOKENS>`
    /// - Environment: `PRHARVEST_TOKENS` or `GITHUB_TOKEN` (single token)
    /// - Config file: `tokens = "..."`
    #[ortho_config(cli_short = 't')]
    pub tokens: Option<String>,

    /// Repository owner (e.g., "octocat").
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// API base URL for GitHub Enterprise, e.g.
    /// `https://ghe.example.com/api/v3`. Defaults to the public API.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Only pull requests updated on or after this date (`YYYY-MM-DD`).
    #[ortho_config(cli_short = 's')]
    pub since: Option<String>,

    /// Maximum number of records to return.
    #[ortho_config(cli_short = 'm')]
    pub max_items: usize,

    /// Full-fetch strategy: `bulk` (GraphQL) or `paginated` (REST).
    #[ortho_config()]
    pub strategy: String,

    /// State filter: `open`, `closed` or `all`.
    #[ortho_config()]
    pub state: String,

    /// Skips draft pull requests.
    ///
    /// Note: `ortho_config` does not load boolean values from the
    /// environment, so this is set through the CLI or a config file.
    #[ortho_config()]
    pub exclude_drafts: bool,

    /// Directory holding cache snapshots.
    #[ortho_config()]
    pub cache_dir: String,

    /// Directory holding job checkpoints.
    #[ortho_config()]
    pub checkpoint_dir: String,

    /// Pause between serial item fetches, in milliseconds.
    #[ortho_config()]
    pub request_delay_ms: u64,

    /// Deadline for each outbound call, in seconds.
    #[ortho_config()]
    pub request_timeout_seconds: u64,

    /// Concurrent check-run lookups after a bulk fetch.
    #[ortho_config()]
    pub augmentation_workers: usize,

    /// Nodes requested per GraphQL page (1 to 100).
    #[ortho_config()]
    pub page_size: u32,

    /// Disables the repository modification probe, so a cached snapshot
    /// with a matching date is served without any network call.
    #[ortho_config()]
    pub no_probe: bool,

    /// Emits pipeline telemetry events to stderr as JSON lines.
    #[ortho_config()]
    pub telemetry: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            tokens: None,
            owner: None,
            repo: None,
            api_base: None,
            since: None,
            max_items: DEFAULT_MAX_ITEMS,
            strategy: FetchStrategy::Bulk.as_str().to_owned(),
            state: PullRequestState::All.as_str().to_owned(),
            exclude_drafts: false,
            cache_dir: DEFAULT_CACHE_DIR.to_owned(),
            checkpoint_dir: DEFAULT_CHECKPOINT_DIR.to_owned(),
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            augmentation_workers: DEFAULT_AUGMENTATION_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
            no_probe: false,
            telemetry: false,
        }
    }
}

impl HarvestConfig {
    /// Resolves the configured tokens, falling back to the legacy
    /// `GITHUB_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] when no source provides a
    /// non-blank token.
    pub fn resolve_tokens(&self) -> Result<Vec<PersonalAccessToken>, IntakeError> {
        let raw = self
            .tokens
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(IntakeError::MissingToken)?;

        let tokens: Vec<PersonalAccessToken> = raw
            .split(',')
            .filter_map(|value| PersonalAccessToken::new(value).ok())
            .collect();
        if tokens.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(tokens)
    }

    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when owner or repo is missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str), IntakeError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok((owner.as_str(), repo.as_str())),
            (None, _) => Err(IntakeError::Configuration {
                message: "repository owner is required (use --owner or -o)".to_owned(),
            }),
            (_, None) => Err(IntakeError::Configuration {
                message: "repository name is required (use --repo or -r)".to_owned(),
            }),
        }
    }

    /// Builds the repository locator, honouring `api_base` when set.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when owner or repo is missing
    /// and [`IntakeError::InvalidUrl`] for a malformed `api_base`.
    pub fn repository_locator(&self) -> Result<RepositoryLocator, IntakeError> {
        let (owner, repo) = self.require_repository_info()?;
        match self.api_base.as_deref() {
            Some(api_base) => RepositoryLocator::with_api_base(owner, repo, api_base),
            None => RepositoryLocator::from_owner_repo(owner, repo),
        }
    }

    /// Parses the lower-bound date.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no date is configured and
    /// [`IntakeError::InvalidDate`] when it is not `YYYY-MM-DD`.
    pub fn since_date(&self) -> Result<NaiveDate, IntakeError> {
        let raw = self
            .since
            .as_deref()
            .ok_or_else(|| IntakeError::Configuration {
                message: "a since date is required (use --since or -s)".to_owned(),
            })?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| IntakeError::InvalidDate {
            value: raw.to_owned(),
        })
    }

    /// Parses the configured full-fetch strategy.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] for an unknown strategy.
    pub fn fetch_strategy(&self) -> Result<FetchStrategy, IntakeError> {
        match self.strategy.trim().to_ascii_lowercase().as_str() {
            "bulk" | "graphql" => Ok(FetchStrategy::Bulk),
            "paginated" | "serial" | "rest" => Ok(FetchStrategy::Paginated),
            other => Err(IntakeError::Configuration {
                message: format!("unknown strategy '{other}' (expected bulk or paginated)"),
            }),
        }
    }

    /// Parses the configured state filter.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] for an unknown state.
    pub fn state_filter(&self) -> Result<PullRequestState, IntakeError> {
        match self.state.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PullRequestState::Open),
            "closed" => Ok(PullRequestState::Closed),
            "all" => Ok(PullRequestState::All),
            other => Err(IntakeError::Configuration {
                message: format!("unknown state '{other}' (expected open, closed or all)"),
            }),
        }
    }

    /// Builds runtime settings from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] for an unknown strategy or
    /// state, or a page size outside 1 to 100.
    pub fn harvest_settings(&self) -> Result<HarvestSettings, IntakeError> {
        if !(1..=100).contains(&self.page_size) {
            return Err(IntakeError::Configuration {
                message: format!("page_size must be between 1 and 100, got {}", self.page_size),
            });
        }
        Ok(HarvestSettings {
            request_delay: Duration::from_millis(self.request_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            page_size: self.page_size,
            augmentation_workers: self.augmentation_workers.max(1),
            state: self.state_filter()?,
            include_drafts: !self.exclude_drafts,
            strategy: self.fetch_strategy()?,
            probe_repository_changes: !self.no_probe,
        })
    }
}

#[cfg(test)]
mod tests;
