//! Shared fixtures for fetcher and coordinator tests.

use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use tempfile::TempDir;

use crate::github::credential_pool::CredentialPool;
use crate::github::error::IntakeError;
use crate::github::gateway::{HistoryGateway, PaginatedPullRequests};
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::github::models::PullRequestSummary;
use crate::github::pagination::PageInfo;
use crate::github::rate_limit::RateLimitInfo;
use crate::persistence::{CheckpointStore, SnapshotStore};
use crate::telemetry::RecordingTelemetrySink;

use super::context::HarvestContext;
use super::settings::HarvestSettings;
use super::sink::CollectingRecordSink;

/// Reset instant used by quota errors: 2100-01-01T00:00:00Z.
pub const FAR_RESET: u64 = 4_102_444_800;

pub struct HarvestFixture {
    _temp_dir: TempDir,
    pub base: Utf8PathBuf,
    pub checkpoints: CheckpointStore,
    pub snapshots: SnapshotStore,
    pub pool: CredentialPool,
    pub settings: HarvestSettings,
    pub sink: CollectingRecordSink,
    pub telemetry: RecordingTelemetrySink,
    pub locator: RepositoryLocator,
}

impl HarvestFixture {
    pub fn context<'fixture, G>(&'fixture self, gateway: &'fixture G) -> HarvestContext<'fixture, G>
    where
        G: HistoryGateway,
    {
        HarvestContext::new(gateway, &self.pool, &self.checkpoints, &self.settings)
            .with_record_sink(&self.sink)
            .with_telemetry(&self.telemetry)
    }
}

/// Builds a fixture whose pool holds one credential per quota.
pub fn harvest_fixture(quotas: &[u32]) -> HarvestFixture {
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let base = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .expect("temp directory path must be UTF-8");
    let tokens = quotas
        .iter()
        .enumerate()
        .map(|(index, quota)| {
            let token = PersonalAccessToken::new(format!("token-{index}"))
                .expect("token should be valid");
            (token, *quota)
        })
        .collect();
    let settings = HarvestSettings {
        request_delay: Duration::ZERO,
        ..HarvestSettings::default()
    };

    HarvestFixture {
        checkpoints: CheckpointStore::new(base.join("checkpoints")),
        snapshots: SnapshotStore::new(base.join("cache")),
        pool: CredentialPool::with_quotas(tokens).expect("pool should build"),
        settings,
        sink: CollectingRecordSink::default(),
        telemetry: RecordingTelemetrySink::default(),
        locator: RepositoryLocator::from_owner_repo("octo", "repo")
            .expect("locator should be valid"),
        base,
        _temp_dir: temp_dir,
    }
}

pub fn since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
}

pub fn listing(items: Vec<PullRequestSummary>) -> PaginatedPullRequests {
    PaginatedPullRequests {
        items,
        page_info: PageInfo::new(1, 100),
        rate_limit: None,
    }
}

pub fn quota_error() -> IntakeError {
    IntakeError::QuotaExhausted {
        rate_limit: Some(RateLimitInfo::new(5000, 0, FAR_RESET)),
        message: "API rate limit exceeded".to_owned(),
    }
}

pub fn abuse_error(seconds: u64) -> IntakeError {
    IntakeError::AbuseDetected {
        retry_after: Duration::from_secs(seconds),
        message: "You have exceeded a secondary rate limit".to_owned(),
    }
}

pub fn api_error(message: &str) -> IntakeError {
    IntakeError::Api {
        message: message.to_owned(),
    }
}
