//! Chooses between serving cached records, an incremental update and a
//! full fetch.
//!
//! The decision rests on [`CacheSnapshot::is_valid`] plus an optional cheap
//! probe of the repository's modification marker. Snapshots are only ever
//! replaced by the result of a job that ran to completion.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::github::error::IntakeError;
use crate::github::gateway::{BulkOrdering, HistoryGateway, with_timeout};
use crate::github::locator::RepositoryLocator;
use crate::persistence::{CacheSnapshot, SnapshotStore};
use crate::telemetry::TelemetryEvent;

use super::bulk::{BulkFetcher, BulkRequest};
use super::context::HarvestContext;
use super::merge::merge_records;
use super::outcome::{FetchReport, JobStatus};
use super::serial::{FetchOptions, PaginatedFetcher};
use super::settings::FetchStrategy;
use super::start_of_day;

/// How a request will be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// The snapshot is current; no fetch is needed.
    ServeCached(CacheSnapshot),
    /// The repository changed since the snapshot; fetch what was updated
    /// after it and merge.
    Incremental {
        /// Snapshot to merge into.
        snapshot: CacheSnapshot,
        /// Modification marker observed by the probe.
        marker: Option<DateTime<Utc>>,
    },
    /// No usable snapshot exists.
    FullFetch {
        /// Modification marker observed by the probe.
        marker: Option<DateTime<Utc>>,
    },
}

impl SyncPlan {
    /// Short label for logs and telemetry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ServeCached(_) => "cache_hit",
            Self::Incremental { .. } => "incremental",
            Self::FullFetch { .. } => "full",
        }
    }
}

/// Front door of the pipeline: answers "records for R since D".
pub struct SyncCoordinator<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    context: &'run HarvestContext<'ctx, Gateway>,
    snapshots: &'run SnapshotStore,
}

impl<'run, 'ctx, Gateway> SyncCoordinator<'run, 'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    /// Creates a coordinator over the given context and snapshot store.
    #[must_use]
    pub const fn new(
        context: &'run HarvestContext<'ctx, Gateway>,
        snapshots: &'run SnapshotStore,
    ) -> Self {
        Self { context, snapshots }
    }

    /// Decides how to satisfy a request for `since_date`.
    ///
    /// Probes the repository modification marker when probing is enabled;
    /// a failed probe counts as no signal. A snapshot written without a
    /// marker is stale whenever a marker is observed.
    pub async fn plan(&self, locator: &RepositoryLocator, since_date: NaiveDate) -> SyncPlan {
        let snapshot = self
            .snapshots
            .load(locator)
            .filter(|snapshot| snapshot.since_date == since_date);
        let marker = self.probe(locator).await;

        let Some(cached) = snapshot else {
            return SyncPlan::FullFetch { marker };
        };
        let unmarked_but_changed = marker.is_some() && cached.repo_modified_at.is_none();
        if !unmarked_but_changed && cached.is_valid(since_date, marker) {
            SyncPlan::ServeCached(cached)
        } else {
            SyncPlan::Incremental {
                snapshot: cached,
                marker,
            }
        }
    }

    /// Returns records for `locator` updated since `since_date`, at most
    /// `max_items` of them, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns the listing error from a paginated full fetch. Rate-limit
    /// exhaustion is reported through [`FetchReport::status`] instead.
    pub async fn fetch(
        &self,
        locator: &RepositoryLocator,
        since_date: NaiveDate,
        max_items: usize,
    ) -> Result<FetchReport, IntakeError> {
        let repository = locator.full_name();
        let plan = self.plan(locator, since_date).await;
        info!(%repository, plan = plan.label(), %since_date, max_items, "planned fetch");
        self.context.emit(TelemetryEvent::FetchPlanned {
            repository,
            plan: plan.label().to_owned(),
        });

        match plan {
            SyncPlan::ServeCached(snapshot) => Ok(FetchReport::new(
                snapshot.truncated(max_items),
                JobStatus::Completed,
            )),
            SyncPlan::Incremental { snapshot, marker } => {
                Ok(self.incremental(locator, snapshot, marker, max_items).await)
            }
            SyncPlan::FullFetch { marker } => {
                self.full(locator, since_date, marker, max_items).await
            }
        }
    }

    async fn incremental(
        &self,
        locator: &RepositoryLocator,
        snapshot: CacheSnapshot,
        marker: Option<DateTime<Utc>>,
        max_items: usize,
    ) -> FetchReport {
        let started_at = Utc::now();
        let CacheSnapshot {
            repo,
            fetched_at,
            since_date,
            records: cached,
            ..
        } = snapshot;

        // The merge needs every change since the snapshot, not just the
        // first `max_items`.
        let request = BulkRequest {
            ordering: BulkOrdering::UpdatedAt,
            cutoff: fetched_at,
            max_items: usize::MAX,
        };
        let fetched = BulkFetcher::new(self.context).fetch(locator, &request).await;
        let merged = merge_records(cached, fetched.records);
        info!(
            repository = %repo,
            added = merged.added,
            updated = merged.updated,
            retained = merged.retained,
            "merged incremental update"
        );

        let refreshed = CacheSnapshot {
            repo,
            fetched_at: started_at,
            since_date,
            repo_modified_at: marker,
            records: merged.records,
        };
        if fetched.status.is_completed() {
            self.persist(locator, &refreshed);
        } else {
            warn!(
                repository = %refreshed.repo,
                status = fetched.status.label(),
                "incremental fetch incomplete; keeping previous snapshot"
            );
        }
        FetchReport::new(refreshed.truncated(max_items), fetched.status)
    }

    async fn full(
        &self,
        locator: &RepositoryLocator,
        since_date: NaiveDate,
        marker: Option<DateTime<Utc>>,
        max_items: usize,
    ) -> Result<FetchReport, IntakeError> {
        let started_at = Utc::now();
        let report = match self.context.settings.strategy {
            FetchStrategy::Bulk => {
                let request = BulkRequest {
                    ordering: BulkOrdering::CreatedAt,
                    cutoff: start_of_day(since_date),
                    max_items,
                };
                BulkFetcher::new(self.context).fetch(locator, &request).await
            }
            FetchStrategy::Paginated => {
                let options = FetchOptions {
                    since: since_date,
                    max_items,
                };
                PaginatedFetcher::new(self.context)
                    .fetch(locator, &options)
                    .await?
            }
        };

        if report.status.is_completed() {
            let snapshot = CacheSnapshot {
                repo: locator.full_name(),
                fetched_at: started_at,
                since_date,
                repo_modified_at: marker,
                records: report.records.clone(),
            };
            self.persist(locator, &snapshot);
        }
        Ok(report)
    }

    async fn probe(&self, locator: &RepositoryLocator) -> Option<DateTime<Utc>> {
        let context = self.context;
        if !context.settings.probe_repository_changes {
            return None;
        }
        let credential = context.pool.best_client().ok()?;
        let result = with_timeout(
            "repository probe",
            context.settings.request_timeout,
            context.gateway.repository_modified_at(&credential, locator),
        )
        .await;
        context.pool.record_usage(credential.id(), 1);
        match result {
            Ok(marker) => marker,
            Err(error) => {
                debug!(repository = %locator.full_name(), %error, "repository probe failed");
                None
            }
        }
    }

    fn persist(&self, locator: &RepositoryLocator, snapshot: &CacheSnapshot) {
        match self.snapshots.save(locator, snapshot) {
            Ok(()) => debug!(
                repository = %snapshot.repo,
                records = snapshot.records.len(),
                "saved cache snapshot"
            ),
            Err(error) => warn!(repository = %snapshot.repo, %error, "failed to save cache snapshot"),
        }
    }
}
