//! Page-at-a-time GraphQL acquisition.
//!
//! Each page returns fully nested records, so a job costs one call per page
//! plus one check-run lookup per record during augmentation. Results come
//! newest first in the chosen ordering, which lets the loop stop at the
//! first record older than the cutoff.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::github::error::IntakeError;
use crate::github::gateway::{
    BulkOrdering, BulkQuery, HistoryGateway, MAX_GRAPHQL_PAGE_SIZE, with_timeout,
};
use crate::github::locator::RepositoryLocator;
use crate::github::models::PullRequestRecord;
use crate::github::pagination::CursorState;
use crate::persistence::Checkpoint;
use crate::telemetry::TelemetryEvent;

use super::augment::augment_check_runs;
use super::context::HarvestContext;
use super::outcome::{CallOutcome, FetchReport, JobStatus};
use super::rotation::{
    CredentialRotation, MAX_ABUSE_RETRIES, abuse_pause, backoff_wait,
};

/// Bounds for one bulk fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkRequest {
    /// Field results are ordered by, newest first.
    pub ordering: BulkOrdering,
    /// Records whose ordering field precedes this instant end the job.
    pub cutoff: DateTime<Utc>,
    /// Maximum number of records.
    pub max_items: usize,
}

/// Fetches pull requests through paged GraphQL queries.
pub struct BulkFetcher<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    context: &'run HarvestContext<'ctx, Gateway>,
}

impl<'run, 'ctx, Gateway> BulkFetcher<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    /// Creates a fetcher over the given context.
    #[must_use]
    pub const fn new(context: &'run HarvestContext<'ctx, Gateway>) -> Self {
        Self { context }
    }

    /// Runs a bulk fetch job followed by check-run augmentation.
    ///
    /// Never fails outright: a page error ends the loop with
    /// [`JobStatus::Interrupted`] and whatever was collected.
    pub async fn fetch(&self, locator: &RepositoryLocator, request: &BulkRequest) -> FetchReport {
        let context = self.context;
        let repository = locator.full_name();
        let mut checkpoint = Checkpoint::new(repository.clone());
        if let Err(error) = context.checkpoints.clear_records(locator) {
            warn!(%repository, %error, "failed to reset record log");
        }
        info!(
            %repository,
            ordering = request.ordering.as_graphql(),
            cutoff = %request.cutoff,
            max_items = request.max_items,
            "starting bulk fetch"
        );

        let (mut records, status) = self.collect_pages(locator, request, &mut checkpoint).await;

        if !matches!(status, JobStatus::Aborted) {
            augment_check_runs(context, locator, &mut records).await;
        }
        for record in &records {
            context.sink.accept(record);
        }

        if status.is_completed() {
            if let Err(error) = context.checkpoints.clear(locator) {
                warn!(%repository, %error, "failed to remove finished checkpoint");
            }
        } else if let Err(error) = context.checkpoints.save(locator, &checkpoint) {
            warn!(%repository, %error, "failed to save checkpoint");
        }

        info!(
            %repository,
            status = status.label(),
            records = records.len(),
            "bulk fetch finished"
        );
        context.emit(TelemetryEvent::JobFinished {
            repository,
            status: status.label().to_owned(),
            records: records.len(),
        });
        FetchReport::new(records, status)
    }

    async fn collect_pages(
        &self,
        locator: &RepositoryLocator,
        request: &BulkRequest,
        checkpoint: &mut Checkpoint,
    ) -> (Vec<PullRequestRecord>, JobStatus) {
        let context = self.context;
        let settings = context.settings;
        let repository = locator.full_name();
        let mut rotation = CredentialRotation::new(
            context.pool,
            context.gateway,
            context.telemetry,
            context.settings.request_timeout,
        );
        let mut records: Vec<PullRequestRecord> = Vec::new();
        let mut cursor = CursorState::Start;
        let mut pages: u32 = 0;
        let mut abuse_attempt = 0;

        loop {
            if context.abort.is_aborted() {
                return (records, JobStatus::Aborted);
            }
            let remaining = request.max_items.saturating_sub(records.len());
            if remaining == 0 || cursor.is_exhausted() {
                return (records, JobStatus::Completed);
            }
            let credential = match rotation.acquire().await {
                Ok(credential) => credential,
                Err(status) => return (records, status),
            };

            let query = BulkQuery {
                first: page_size(settings.page_size, remaining),
                after: cursor.as_after().map(ToOwned::to_owned),
                ordering: request.ordering,
                state: settings.state,
            };
            let result = with_timeout(
                "pull request page",
                settings.request_timeout,
                context
                    .gateway
                    .pull_request_page(&credential, locator, &query),
            )
            .await;
            context.pool.record_usage(credential.id(), 1);

            let page = match CallOutcome::from(result) {
                CallOutcome::Success(page) => page,
                CallOutcome::RateLimited { reset_at } => {
                    if let Err(status) = rotation.switch_from(&credential, reset_at) {
                        return (records, status);
                    }
                    continue;
                }
                CallOutcome::AbuseLimited { retry_after } => {
                    if abuse_attempt >= MAX_ABUSE_RETRIES {
                        let error = IntakeError::AbuseDetected {
                            retry_after,
                            message: format!("page kept failing after {abuse_attempt} retries"),
                        };
                        self.page_failed(&repository, pages + 1, &error);
                        return (records, JobStatus::Interrupted);
                    }
                    let wait = backoff_wait(retry_after, abuse_attempt);
                    abuse_pause(context.telemetry, &repository, None, wait).await;
                    abuse_attempt += 1;
                    continue;
                }
                CallOutcome::OtherFailure(error) => {
                    self.page_failed(&repository, pages + 1, &error);
                    return (records, JobStatus::Interrupted);
                }
            };
            abuse_attempt = 0;
            pages += 1;
            if let Some(info) = page.rate_limit {
                context.pool.observe(credential.id(), info);
            }

            let mut reached_cutoff = false;
            for record in page.records {
                if request.ordering.timestamp_of(&record) < request.cutoff {
                    reached_cutoff = true;
                    break;
                }
                if record.is_draft && !settings.include_drafts {
                    continue;
                }
                if let Err(error) = context.checkpoints.append_record(locator, &record) {
                    warn!(
                        %repository,
                        number = record.number,
                        %error,
                        "failed to log fetched record"
                    );
                }
                checkpoint.record(record.number);
                records.push(record);
                if records.len() >= request.max_items {
                    break;
                }
            }
            checkpoint.set_total_items_found(records.len());
            if let Err(error) = context.checkpoints.save(locator, checkpoint) {
                warn!(%repository, %error, "failed to save checkpoint");
            }
            debug!(%repository, page = pages, collected = records.len(), "fetched page");

            if reached_cutoff {
                debug!(%repository, "reached records older than the cutoff");
                return (records, JobStatus::Completed);
            }
            cursor = page.cursor;
        }
    }

    fn page_failed(&self, repository: &str, page: u32, error: &IntakeError) {
        warn!(%repository, page, %error, "bulk page failed; stopping");
        self.context.emit(TelemetryEvent::PageFailed {
            repository: repository.to_owned(),
            page,
            reason: error.to_string(),
        });
    }
}

/// Nodes to request: the configured size, capped by what is still wanted
/// and by GitHub's connection limit.
fn page_size(configured: u32, remaining: usize) -> u32 {
    let wanted = u32::try_from(remaining).unwrap_or(u32::MAX);
    configured.min(wanted).clamp(1, MAX_GRAPHQL_PAGE_SIZE)
}
