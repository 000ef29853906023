//! Fetch jobs and the cache/incremental-sync coordinator.
//!
//! [`SyncCoordinator`] is the entry point. It decides whether cached
//! records can be served and otherwise drives one of the two fetchers:
//!
//! - [`PaginatedFetcher`] walks REST listings one item at a time,
//!   checkpointing after every record.
//! - [`BulkFetcher`] pages through GraphQL results and then augments the
//!   records with check runs on a bounded worker pool.
//!
//! Both share credential rotation and abuse backoff, and report how they
//! ended through [`JobStatus`].

mod abort;
mod augment;
mod bulk;
mod context;
mod coordinator;
mod merge;
mod outcome;
mod rotation;
mod serial;
mod settings;
mod sink;

#[cfg(test)]
mod test_fixtures;

pub use abort::AbortSignal;
pub use bulk::{BulkFetcher, BulkRequest};
pub use context::HarvestContext;
pub use coordinator::{SyncCoordinator, SyncPlan};
pub use merge::{MergeResult, merge_records};
pub use outcome::{FetchReport, JobStatus};
pub use rotation::{MAX_ABUSE_RETRIES, MAX_CREDENTIAL_SWITCHES, backoff_wait};
pub use serial::{FetchOptions, PaginatedFetcher};
pub use settings::{
    DEFAULT_AUGMENTATION_WORKERS, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_DELAY,
    DEFAULT_REQUEST_TIMEOUT, FetchStrategy, HarvestSettings,
};
#[cfg(any(test, feature = "test-support"))]
pub use sink::CollectingRecordSink;
pub use sink::{NoopRecordSink, RecordSink};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Midnight UTC at the start of `date`.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
