//! Credential rotation and abuse backoff shared by both fetchers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::github::credential_pool::{Credential, CredentialPool};
use crate::github::error::IntakeError;
use crate::github::gateway::HistoryGateway;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::outcome::JobStatus;

/// Credential switches one job may make before giving up.
pub const MAX_CREDENTIAL_SWITCHES: u32 = 10;

/// Abuse-detection retries per item or page before it is skipped.
pub const MAX_ABUSE_RETRIES: u32 = 3;

/// Wait before retry `attempt` (zero-based) after an abuse signal.
///
/// ```
/// use std::time::Duration;
/// use prharvest::harvest::backoff_wait;
///
/// assert_eq!(backoff_wait(Duration::from_secs(30), 0), Duration::from_secs(30));
/// assert_eq!(backoff_wait(Duration::from_secs(30), 2), Duration::from_secs(120));
/// ```
#[must_use]
pub fn backoff_wait(retry_after: Duration, attempt: u32) -> Duration {
    retry_after.saturating_mul(2_u32.saturating_pow(attempt))
}

/// Per-job view of the pool that counts credential switches.
pub(crate) struct CredentialRotation<'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    pool: &'ctx CredentialPool,
    gateway: &'ctx Gateway,
    telemetry: &'ctx dyn TelemetrySink,
    refresh_timeout: Duration,
    switches: u32,
}

impl<'ctx, Gateway> CredentialRotation<'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    pub(crate) fn new(
        pool: &'ctx CredentialPool,
        gateway: &'ctx Gateway,
        telemetry: &'ctx dyn TelemetrySink,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            gateway,
            telemetry,
            refresh_timeout,
            switches: 0,
        }
    }

    /// Picks the best credential, refreshing exhausted ones once if the pool
    /// looks empty. Each quota query is bounded by the refresh timeout.
    pub(crate) async fn acquire(&self) -> Result<Credential, JobStatus> {
        if let Ok(credential) = self.pool.best_client() {
            return Ok(credential);
        }
        self.pool
            .refresh_exhausted(self.gateway, self.refresh_timeout)
            .await;
        self.pool.best_client().map_err(|error| exhausted_status(&error))
    }

    /// Retires `credential` after a quota signal.
    ///
    /// Returns the terminal status once the switch budget is spent.
    pub(crate) fn switch_from(
        &mut self,
        credential: &Credential,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<(), JobStatus> {
        self.pool.mark_exhausted(credential.id(), reset_at);
        self.telemetry.record(TelemetryEvent::CredentialExhausted {
            credential: credential.id().index(),
            reset_at: reset_at.map(|reset| reset.to_rfc3339()),
        });
        self.switches = self.switches.saturating_add(1);
        if self.switches > MAX_CREDENTIAL_SWITCHES {
            warn!(
                switches = self.switches,
                "credential switch budget spent; stopping job"
            );
            return Err(JobStatus::CredentialsExhausted {
                earliest_reset: self.pool.earliest_reset(),
            });
        }
        info!(
            credential = %credential.id(),
            switches = self.switches,
            "switching credential after quota exhaustion"
        );
        Ok(())
    }
}

fn exhausted_status(error: &IntakeError) -> JobStatus {
    let earliest_reset = match error {
        IntakeError::AllCredentialsExhausted { earliest_reset } => *earliest_reset,
        _ => None,
    };
    JobStatus::CredentialsExhausted { earliest_reset }
}

/// Sleeps out an abuse signal, logging and reporting the wait.
pub(crate) async fn abuse_pause(
    telemetry: &dyn TelemetrySink,
    repository: &str,
    number: Option<u64>,
    wait: Duration,
) {
    warn!(
        %repository,
        ?number,
        retry_after_secs = wait.as_secs(),
        "secondary rate limit hit; backing off"
    );
    telemetry.record(TelemetryEvent::AbuseBackoff {
        repository: repository.to_owned(),
        number,
        wait_seconds: wait.as_secs(),
    });
    tokio::time::sleep(wait).await;
}

#[cfg(test)]
mod tests {
    //! Unit tests for credential rotation.

    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rstest::rstest;
    use tokio::time::Instant;

    use super::{CredentialRotation, MAX_CREDENTIAL_SWITCHES, backoff_wait};
    use crate::github::credential_pool::{Credential, CredentialPool};
    use crate::github::error::IntakeError;
    use crate::github::gateway::{
        BulkQuery, HistoryGateway, ListPullRequestsParams, MockHistoryGateway,
        PaginatedPullRequests, PullRequestPage,
    };
    use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
    use crate::github::models::{CheckRunRecord, PullRequestRecord};
    use crate::github::rate_limit::RateLimitInfo;
    use crate::harvest::outcome::JobStatus;
    use crate::telemetry::{RecordingTelemetrySink, TelemetryEvent};

    const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

    /// Gateway whose quota endpoint accepts the connection and never answers.
    struct HangingQuotaGateway;

    #[async_trait]
    impl HistoryGateway for HangingQuotaGateway {
        async fn list_pull_requests(
            &self,
            _credential: &Credential,
            _locator: &RepositoryLocator,
            _params: &ListPullRequestsParams,
        ) -> Result<PaginatedPullRequests, IntakeError> {
            unreachable!("rotation never lists pull requests")
        }

        async fn pull_request_history(
            &self,
            _credential: &Credential,
            _locator: &RepositoryLocator,
            _number: u64,
        ) -> Result<PullRequestRecord, IntakeError> {
            unreachable!("rotation never fetches history")
        }

        async fn check_runs(
            &self,
            _credential: &Credential,
            _locator: &RepositoryLocator,
            _sha: &str,
        ) -> Result<Vec<CheckRunRecord>, IntakeError> {
            unreachable!("rotation never fetches check runs")
        }

        async fn pull_request_page(
            &self,
            _credential: &Credential,
            _locator: &RepositoryLocator,
            _query: &BulkQuery,
        ) -> Result<PullRequestPage, IntakeError> {
            unreachable!("rotation never fetches pages")
        }

        async fn repository_modified_at(
            &self,
            _credential: &Credential,
            _locator: &RepositoryLocator,
        ) -> Result<Option<DateTime<Utc>>, IntakeError> {
            unreachable!("rotation never reads the modification marker")
        }

        async fn rate_limit(&self, _credential: &Credential) -> Result<RateLimitInfo, IntakeError> {
            std::future::pending().await
        }
    }

    fn pool(size: usize) -> CredentialPool {
        let tokens = (0..size)
            .map(|index| {
                PersonalAccessToken::new(format!("token-{index}")).expect("token should be valid")
            })
            .collect();
        CredentialPool::new(tokens).expect("pool should build")
    }

    #[rstest]
    #[case(0, 30)]
    #[case(1, 60)]
    #[case(3, 240)]
    fn backoff_doubles_per_attempt(#[case] attempt: u32, #[case] expected_secs: u64) {
        assert_eq!(
            backoff_wait(Duration::from_secs(30), attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[tokio::test]
    async fn switch_marks_credential_and_reports_event() {
        let pool = pool(2);
        let gateway = MockHistoryGateway::new();
        let telemetry = RecordingTelemetrySink::default();
        let mut rotation = CredentialRotation::new(&pool, &gateway, &telemetry, REFRESH_TIMEOUT);

        let first = rotation.acquire().await.expect("credential available");
        rotation.switch_from(&first, None).expect("within budget");
        let second = rotation.acquire().await.expect("second credential available");

        assert_ne!(first.id(), second.id());
        assert_eq!(pool.exhausted_count(), 1);
        assert_eq!(
            telemetry.take(),
            vec![TelemetryEvent::CredentialExhausted {
                credential: first.id().index(),
                reset_at: None,
            }]
        );
    }

    #[tokio::test]
    async fn acquire_refreshes_before_reporting_exhaustion() {
        let pool = pool(1);
        let mut gateway = MockHistoryGateway::new();
        gateway
            .expect_rate_limit()
            .times(1)
            .returning(|_| Err(IntakeError::Network {
                message: "offline".to_owned(),
            }));
        let telemetry = RecordingTelemetrySink::default();
        let mut rotation = CredentialRotation::new(&pool, &gateway, &telemetry, REFRESH_TIMEOUT);
        let only = rotation.acquire().await.expect("credential available");
        rotation.switch_from(&only, None).expect("within budget");

        let status = rotation.acquire().await.expect_err("pool is exhausted");

        assert_eq!(status, JobStatus::CredentialsExhausted { earliest_reset: None });
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_quota_refresh_times_out_to_exhaustion() {
        let pool = pool(1);
        let gateway = HangingQuotaGateway;
        let telemetry = RecordingTelemetrySink::default();
        let mut rotation = CredentialRotation::new(&pool, &gateway, &telemetry, REFRESH_TIMEOUT);
        let only = rotation.acquire().await.expect("credential available");
        rotation.switch_from(&only, None).expect("within budget");
        let started = Instant::now();

        let status = rotation.acquire().await.expect_err("pool stays exhausted");

        assert_eq!(status, JobStatus::CredentialsExhausted { earliest_reset: None });
        assert!(started.elapsed() >= REFRESH_TIMEOUT);
        assert_eq!(pool.exhausted_count(), 1);
    }

    #[tokio::test]
    async fn switch_budget_is_bounded() {
        let pool = pool(1);
        let gateway = MockHistoryGateway::new();
        let telemetry = RecordingTelemetrySink::default();
        let mut rotation = CredentialRotation::new(&pool, &gateway, &telemetry, REFRESH_TIMEOUT);
        let credential = pool.best_client().expect("credential available");

        for _ in 0..MAX_CREDENTIAL_SWITCHES {
            rotation
                .switch_from(&credential, None)
                .expect("within budget");
        }

        assert!(matches!(
            rotation.switch_from(&credential, None),
            Err(JobStatus::CredentialsExhausted { .. })
        ));
    }
}
