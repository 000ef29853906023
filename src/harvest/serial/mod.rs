//! Serial REST acquisition, one pull request at a time.
//!
//! The fetcher lists candidates newest-update first, then loads each one
//! with its commits, reviews, files and check runs, pausing after every
//! attempted item. Every fetched record is logged and its number
//! checkpointed before the next item starts, so a crashed job resumes
//! without refetching and still reports what earlier runs collected.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::github::credential_pool::Credential;
use crate::github::error::IntakeError;
use crate::github::gateway::{
    CALLS_PER_HISTORY, HistoryGateway, ListPullRequestsParams, MAX_REST_PAGE_SIZE, with_timeout,
};
use crate::github::locator::RepositoryLocator;
use crate::github::models::{PullRequestRecord, PullRequestSummary};
use crate::persistence::Checkpoint;
use crate::telemetry::TelemetryEvent;

use super::context::HarvestContext;
use super::outcome::{CallOutcome, FetchReport, JobStatus};
use super::rotation::{
    CredentialRotation, MAX_ABUSE_RETRIES, abuse_pause, backoff_wait,
};
use super::start_of_day;

/// Bounds for one serial fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Pull requests last updated before this date are not fetched.
    pub since: NaiveDate,
    /// Maximum number of records, counting those fetched by an earlier
    /// interrupted run.
    pub max_items: usize,
}

/// What happened to a single candidate.
enum ItemOutcome {
    Fetched,
    Skipped,
    QuotaExhausted { reset_at: Option<DateTime<Utc>> },
}

/// Mutable state of one job.
struct SerialJob {
    checkpoint: Checkpoint,
    records: Vec<PullRequestRecord>,
}

/// Fetches pull requests one at a time over REST.
pub struct PaginatedFetcher<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    context: &'run HarvestContext<'ctx, Gateway>,
}

impl<'run, 'ctx, Gateway> PaginatedFetcher<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    /// Creates a fetcher over the given context.
    #[must_use]
    pub const fn new(context: &'run HarvestContext<'ctx, Gateway>) -> Self {
        Self { context }
    }

    /// Runs a serial fetch job, resuming from any saved checkpoint.
    ///
    /// Records fetched by earlier runs of the same job are included in the
    /// report. Rate-limit signals never fail the job: quota exhaustion
    /// rotates credentials and ends with [`JobStatus::CredentialsExhausted`]
    /// once the pool runs dry, and per-item failures are skipped. A listing
    /// failure once records are held ends the job as
    /// [`JobStatus::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns the listing error when candidates cannot be listed before
    /// any record is held, for a reason other than quota exhaustion or
    /// because the listing keeps hitting the secondary rate limit.
    pub async fn fetch(
        &self,
        locator: &RepositoryLocator,
        options: &FetchOptions,
    ) -> Result<FetchReport, IntakeError> {
        let repository = locator.full_name();
        let checkpoint = self.context.checkpoints.load(locator);
        let records = self.resumed_records(locator, &checkpoint);
        info!(
            %repository,
            since = %options.since,
            max_items = options.max_items,
            resumed = checkpoint.fetched_count(),
            recovered = records.len(),
            "starting paginated fetch"
        );
        let mut job = SerialJob {
            checkpoint,
            records,
        };

        let status = match self.run(locator, options, &mut job).await {
            Ok(status) => status,
            Err(error) if job.records.is_empty() => return Err(error),
            Err(error) => {
                warn!(
                    %repository,
                    %error,
                    held = job.records.len(),
                    "listing failed; returning partial result"
                );
                JobStatus::Interrupted
            }
        };
        Ok(self.finish(locator, job, status))
    }

    /// Records an interrupted run already fetched, or an emptied log when
    /// the job starts fresh.
    fn resumed_records(
        &self,
        locator: &RepositoryLocator,
        checkpoint: &Checkpoint,
    ) -> Vec<PullRequestRecord> {
        let checkpoints = self.context.checkpoints;
        if checkpoint.fetched_count() > 0 {
            return checkpoints.load_records(locator, checkpoint);
        }
        if let Err(error) = checkpoints.clear_records(locator) {
            warn!(repository = %locator.full_name(), %error, "failed to reset record log");
        }
        Vec::new()
    }

    async fn run(
        &self,
        locator: &RepositoryLocator,
        options: &FetchOptions,
        job: &mut SerialJob,
    ) -> Result<JobStatus, IntakeError> {
        let context = self.context;
        let repository = locator.full_name();
        let mut rotation = CredentialRotation::new(
            context.pool,
            context.gateway,
            context.telemetry,
            context.settings.request_timeout,
        );
        let mut listing_attempt = 0;

        'listing: loop {
            if context.abort.is_aborted() {
                return Ok(JobStatus::Aborted);
            }
            let wanted = options
                .max_items
                .saturating_sub(job.checkpoint.fetched_count());
            if wanted == 0 {
                return Ok(JobStatus::Completed);
            }
            let credential = match rotation.acquire().await {
                Ok(credential) => credential,
                Err(status) => return Ok(status),
            };

            let listing = self
                .list_candidates(&credential, locator, options, &job.checkpoint, wanted)
                .await;
            let candidates = match CallOutcome::from(listing) {
                CallOutcome::Success(candidates) => candidates,
                CallOutcome::RateLimited { reset_at } => {
                    if let Err(status) = rotation.switch_from(&credential, reset_at) {
                        return Ok(status);
                    }
                    continue 'listing;
                }
                CallOutcome::AbuseLimited { retry_after } => {
                    if listing_attempt >= MAX_ABUSE_RETRIES {
                        return Err(IntakeError::AbuseDetected {
                            retry_after,
                            message: "listing kept hitting the secondary rate limit".to_owned(),
                        });
                    }
                    let wait = backoff_wait(retry_after, listing_attempt);
                    abuse_pause(context.telemetry, &repository, None, wait).await;
                    listing_attempt += 1;
                    continue 'listing;
                }
                CallOutcome::OtherFailure(error) => return Err(error),
            };
            listing_attempt = 0;

            job.checkpoint
                .set_total_items_found(job.checkpoint.fetched_count() + candidates.len());
            debug!(%repository, candidates = candidates.len(), "listed candidates");

            for candidate in candidates {
                if context.abort.is_aborted() {
                    return Ok(JobStatus::Aborted);
                }
                match self
                    .fetch_item(&credential, locator, candidate.number, job)
                    .await
                {
                    ItemOutcome::Fetched | ItemOutcome::Skipped => {
                        tokio::time::sleep(context.settings.request_delay).await;
                    }
                    ItemOutcome::QuotaExhausted { reset_at } => {
                        if let Err(status) = rotation.switch_from(&credential, reset_at) {
                            return Ok(status);
                        }
                        continue 'listing;
                    }
                }
            }
            return Ok(JobStatus::Completed);
        }
    }

    /// Lists up to `wanted` unfetched candidates, newest update first.
    async fn list_candidates(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        options: &FetchOptions,
        checkpoint: &Checkpoint,
        wanted: usize,
    ) -> Result<Vec<PullRequestSummary>, IntakeError> {
        let context = self.context;
        let settings = context.settings;
        let cutoff = start_of_day(options.since);
        let mut candidates = Vec::new();
        let mut page = 1;

        loop {
            let params = ListPullRequestsParams {
                state: settings.state,
                page,
                per_page: MAX_REST_PAGE_SIZE,
            };
            let result = with_timeout(
                "pull request listing",
                settings.request_timeout,
                context
                    .gateway
                    .list_pull_requests(credential, locator, &params),
            )
            .await;
            context.pool.record_usage(credential.id(), 1);
            let listing = result?;
            if let Some(info) = listing.rate_limit {
                context.pool.observe(credential.id(), info);
            }

            for summary in listing.items {
                // Listings are newest-update first, so the first stale item
                // ends the scan.
                if summary.updated_at < cutoff {
                    return Ok(candidates);
                }
                if (summary.is_draft && !settings.include_drafts)
                    || checkpoint.contains(summary.number)
                {
                    continue;
                }
                candidates.push(summary);
                if candidates.len() >= wanted {
                    return Ok(candidates);
                }
            }

            match listing.page_info.next_page() {
                Some(next) => page = next,
                None => return Ok(candidates),
            }
        }
    }

    async fn fetch_item(
        &self,
        credential: &Credential,
        locator: &RepositoryLocator,
        number: u64,
        job: &mut SerialJob,
    ) -> ItemOutcome {
        let context = self.context;
        let repository = locator.full_name();
        let mut attempt = 0;

        loop {
            let result = with_timeout(
                "pull request history",
                context.settings.request_timeout,
                context
                    .gateway
                    .pull_request_history(credential, locator, number),
            )
            .await;
            context
                .pool
                .record_usage(credential.id(), CALLS_PER_HISTORY);

            match CallOutcome::from(result) {
                CallOutcome::Success(record) => {
                    self.accept(locator, record, job);
                    return ItemOutcome::Fetched;
                }
                CallOutcome::RateLimited { reset_at } => {
                    return ItemOutcome::QuotaExhausted { reset_at };
                }
                CallOutcome::AbuseLimited { retry_after } => {
                    if attempt >= MAX_ABUSE_RETRIES {
                        self.skip(
                            &repository,
                            number,
                            format!("secondary rate limit persisted after {attempt} retries"),
                        );
                        return ItemOutcome::Skipped;
                    }
                    let wait = backoff_wait(retry_after, attempt);
                    abuse_pause(context.telemetry, &repository, Some(number), wait).await;
                    attempt += 1;
                }
                CallOutcome::OtherFailure(error) => {
                    self.skip(&repository, number, error.to_string());
                    return ItemOutcome::Skipped;
                }
            }
        }
    }

    /// Hands a record to the sink, logs it, then checkpoints it.
    fn accept(&self, locator: &RepositoryLocator, record: PullRequestRecord, job: &mut SerialJob) {
        let context = self.context;
        context.sink.accept(&record);
        if let Err(error) = context.checkpoints.append_record(locator, &record) {
            warn!(
                repository = %locator.full_name(),
                number = record.number,
                %error,
                "failed to log fetched record"
            );
        }
        job.checkpoint.record(record.number);
        if let Err(error) = context.checkpoints.save(locator, &job.checkpoint) {
            warn!(
                repository = %locator.full_name(),
                number = record.number,
                %error,
                "failed to save checkpoint"
            );
        }
        debug!(
            repository = %record.repository,
            number = record.number,
            "fetched pull request"
        );
        job.records.push(record);
    }

    fn skip(&self, repository: &str, number: u64, reason: String) {
        warn!(%repository, number, %reason, "skipping pull request");
        self.context.emit(TelemetryEvent::ItemSkipped {
            repository: repository.to_owned(),
            number,
            reason,
        });
    }

    fn finish(&self, locator: &RepositoryLocator, job: SerialJob, status: JobStatus) -> FetchReport {
        let context = self.context;
        let repository = locator.full_name();
        let SerialJob {
            mut checkpoint,
            records,
        } = job;

        if status.is_completed() {
            checkpoint.mark_completed();
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
            "paginated fetch finished"
        );
        context.emit(TelemetryEvent::JobFinished {
            repository,
            status: status.label().to_owned(),
            records: records.len(),
        });
        FetchReport::new(records, status)
    }
}
