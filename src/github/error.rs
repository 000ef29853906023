//! Error types exposed by the GitHub intake layer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while configuring the pipeline or communicating with
/// GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// The provided URL could not be parsed.
    #[error("repository URL is invalid: {0}")]
    InvalidUrl(String),

    /// The repository path is incomplete.
    #[error("repository must be given as <owner>/<repo>")]
    MissingPathSegments,

    /// A date could not be parsed.
    #[error("date must use the YYYY-MM-DD format: {value}")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// No authentication token was supplied.
    #[error("at least one personal access token is required")]
    MissingToken,

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("failed to decode GitHub response: {message}")]
    Decode {
        /// Decoder error detail.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// An outbound call did not finish within the configured timeout.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation that was in flight.
        operation: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The credential used for the call has no primary quota left.
    #[error("GitHub API rate limit exceeded: {message}")]
    QuotaExhausted {
        /// Rate limit info if available from response headers.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },

    /// GitHub's secondary (abuse detection) limit throttled the request.
    #[error("GitHub secondary rate limit hit, retry after {}s: {message}", retry_after.as_secs())]
    AbuseDetected {
        /// Wait hinted by the `retry-after` header.
        retry_after: Duration,
        /// Error message from GitHub.
        message: String,
    },

    /// Every credential in the pool is exhausted.
    #[error("all credentials are exhausted{}", describe_reset(*earliest_reset))]
    AllCredentialsExhausted {
        /// Earliest known reset across the pool, if any reset is known.
        earliest_reset: Option<DateTime<Utc>>,
    },

    /// Invalid pagination parameters.
    #[error("invalid pagination: {message}")]
    InvalidPagination {
        /// Description of the invalid parameter.
        message: String,
    },
}

impl IntakeError {
    /// Returns true for errors that are signals from GitHub's rate limiter
    /// rather than failures of the request itself.
    #[must_use]
    pub const fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Self::QuotaExhausted { .. } | Self::AbuseDetected { .. }
        )
    }
}

fn describe_reset(earliest_reset: Option<DateTime<Utc>>) -> String {
    earliest_reset.map_or_else(String::new, |reset| {
        format!(" (earliest reset at {})", reset.to_rfc3339())
    })
}
