//! Job results and the classification of individual call outcomes.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::github::error::IntakeError;
use crate::github::models::PullRequestRecord;

/// How a fetch job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every candidate was processed.
    Completed,
    /// The caller raised the [`AbortSignal`](super::AbortSignal).
    Aborted,
    /// A page failed for a reason other than rate limiting.
    Interrupted,
    /// No credential had quota left; the result is partial.
    CredentialsExhausted {
        /// Earliest known reset across the pool.
        earliest_reset: Option<DateTime<Utc>>,
    },
}

impl JobStatus {
    /// Whether the job ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Short label for logs and telemetry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Interrupted => "interrupted",
            Self::CredentialsExhausted { .. } => "credentials_exhausted",
        }
    }
}

/// Records gathered by a job and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Records, most recently updated first.
    pub records: Vec<PullRequestRecord>,
    /// Final job status.
    pub status: JobStatus,
}

impl FetchReport {
    /// Builds a report, ordering records by `updated_at` descending.
    #[must_use]
    pub fn new(mut records: Vec<PullRequestRecord>, status: JobStatus) -> Self {
        sort_most_recent_first(&mut records);
        Self { records, status }
    }
}

/// Orders records by `updated_at`, newest first; ties keep their order.
pub(crate) fn sort_most_recent_first(records: &mut [PullRequestRecord]) {
    records.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
}

/// What a single outbound call amounted to.
#[derive(Debug)]
pub(crate) enum CallOutcome<T> {
    Success(T),
    RateLimited { reset_at: Option<DateTime<Utc>> },
    AbuseLimited { retry_after: Duration },
    OtherFailure(IntakeError),
}

impl<T> From<Result<T, IntakeError>> for CallOutcome<T> {
    fn from(result: Result<T, IntakeError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(IntakeError::QuotaExhausted { rate_limit, .. }) => Self::RateLimited {
                reset_at: rate_limit.and_then(|info| info.reset_time()),
            },
            Err(IntakeError::AbuseDetected { retry_after, .. }) => {
                Self::AbuseLimited { retry_after }
            }
            Err(error) => Self::OtherFailure(error),
        }
    }
}
