//! Check-run augmentation for records gathered by the bulk fetcher.
//!
//! The bulk query cannot carry check runs, so each record with at least one
//! commit gets one REST lookup for the check runs of its latest commit.
//! Lookups run on a bounded number of concurrent workers, each drawing the
//! best credential from the pool per call.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::github::error::IntakeError;
use crate::github::gateway::{HistoryGateway, with_timeout};
use crate::github::locator::RepositoryLocator;
use crate::github::models::{CheckRunRecord, PullRequestRecord};
use crate::telemetry::TelemetryEvent;

use super::context::HarvestContext;

/// Tally of one augmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AugmentSummary {
    pub(crate) augmented: usize,
    pub(crate) failed: usize,
    pub(crate) skipped: bool,
}

/// Fills in `check_runs` for every record that has commits.
///
/// Skips the whole pass when the pool's remaining quota cannot cover one
/// call per record. A failed lookup leaves that record's check runs empty.
pub(crate) async fn augment_check_runs<Gateway>(
    context: &HarvestContext<'_, Gateway>,
    locator: &RepositoryLocator,
    records: &mut [PullRequestRecord],
) -> AugmentSummary
where
    Gateway: HistoryGateway + ?Sized,
{
    let repository = locator.full_name();
    let targets: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| !record.commits.is_empty())
        .filter_map(|(index, record)| {
            record
                .latest_commit_sha()
                .map(|sha| (index, sha.to_owned()))
        })
        .collect();
    if targets.is_empty() {
        return AugmentSummary::default();
    }

    let needed = targets.len();
    let remaining = context.pool.total_remaining();
    if remaining < u64::try_from(needed).unwrap_or(u64::MAX) {
        warn!(%repository, needed, remaining, "not enough quota for check-run augmentation");
        context.emit(TelemetryEvent::AugmentationSkipped {
            repository,
            needed,
            remaining,
        });
        return AugmentSummary {
            skipped: true,
            ..AugmentSummary::default()
        };
    }

    let workers = context.settings.augmentation_workers.max(1);
    debug!(%repository, needed, workers, "augmenting records with check runs");
    let results: Vec<(usize, Result<Vec<CheckRunRecord>, IntakeError>)> = stream::iter(targets)
        .map(|(index, sha)| async move { (index, lookup(context, locator, &sha).await) })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut summary = AugmentSummary::default();
    for (index, result) in results {
        let Some(record) = records.get_mut(index) else {
            continue;
        };
        match result {
            Ok(check_runs) => {
                record.check_runs = check_runs;
                summary.augmented += 1;
            }
            Err(error) => {
                warn!(
                    %repository,
                    number = record.number,
                    %error,
                    "check-run lookup failed"
                );
                summary.failed += 1;
            }
        }
    }
    info!(
        %repository,
        augmented = summary.augmented,
        failed = summary.failed,
        "check-run augmentation finished"
    );
    summary
}

async fn lookup<Gateway>(
    context: &HarvestContext<'_, Gateway>,
    locator: &RepositoryLocator,
    sha: &str,
) -> Result<Vec<CheckRunRecord>, IntakeError>
where
    Gateway: HistoryGateway + ?Sized,
{
    let credential = context.pool.best_client()?;
    let result = with_timeout(
        "check runs",
        context.settings.request_timeout,
        context.gateway.check_runs(&credential, locator, sha),
    )
    .await;
    context.pool.record_usage(credential.id(), 1);
    if let Err(IntakeError::QuotaExhausted { rate_limit, .. }) = &result {
        context.pool.mark_exhausted(
            credential.id(),
            rate_limit.and_then(|info| info.reset_time()),
        );
    }
    result
}
