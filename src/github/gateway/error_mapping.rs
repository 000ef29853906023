//! Error mapping helpers for the Octocrab gateway.
//!
//! GitHub answers throttled requests with 403 or 429 and distinguishes the
//! two limits only through headers and wording. Classification order:
//!
//! 1. a `retry-after` header is a secondary (abuse) limit, whatever the
//!    remaining quota says;
//! 2. `x-ratelimit-remaining: 0` is primary quota exhaustion;
//! 3. a message mentioning the secondary limit waits a fixed minute;
//! 4. any other rate-limit message is treated as quota exhaustion.

use std::time::Duration;

use http::{HeaderMap, StatusCode};

use crate::github::error::IntakeError;
use crate::github::rate_limit::{RateLimitInfo, retry_after};

/// Wait applied to secondary-limit responses that carry no `retry-after`.
pub(crate) const DEFAULT_SECONDARY_WAIT: Duration = Duration::from_secs(60);

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

const fn is_throttle_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

fn mentions_secondary_limit(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("secondary rate limit") || lowered.contains("abuse detection")
}

fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().contains("rate limit")
}

/// Maps a non-success HTTP response onto an error variant.
pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    headers: &HeaderMap,
    maybe_message: Option<String>,
) -> IntakeError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    let described = format!("{operation} failed with status {status}: {message}");

    if is_throttle_status(status) {
        if let Some(wait) = retry_after(headers) {
            return IntakeError::AbuseDetected {
                retry_after: wait,
                message: described,
            };
        }

        let rate_limit = RateLimitInfo::from_headers(headers);
        if rate_limit.is_some_and(|info| info.is_exhausted()) {
            return IntakeError::QuotaExhausted {
                rate_limit,
                message: described,
            };
        }

        if mentions_secondary_limit(&message) || status == StatusCode::TOO_MANY_REQUESTS {
            return IntakeError::AbuseDetected {
                retry_after: DEFAULT_SECONDARY_WAIT,
                message: described,
            };
        }

        if mentions_rate_limit(&message) {
            return IntakeError::QuotaExhausted {
                rate_limit,
                message: described,
            };
        }
    }

    if is_auth_failure(status) {
        IntakeError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        }
    } else {
        IntakeError::Api {
            message: described,
        }
    }
}

/// Maps an Octocrab transport or client error.
pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> IntakeError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_http_error(
            operation,
            source.status_code,
            &HeaderMap::new(),
            Some(source.message.clone()),
        );
    }

    if is_network_error(error) {
        return IntakeError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    IntakeError::Api {
        message: format!("{operation} failed: {error}"),
    }
}
