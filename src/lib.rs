//! Acquisition pipeline for GitHub pull request history.
//!
//! The crate fetches pull requests for a repository updated since a given
//! date, spreading calls over a pool of personal access tokens and surviving
//! both kinds of GitHub throttling. Progress is checkpointed so interrupted
//! jobs resume, and completed results are cached so repeated requests are
//! served locally or refreshed incrementally.
//!
//! Start with [`SyncCoordinator`], built over a [`HarvestContext`].

pub mod config;
pub mod github;
pub mod harvest;
pub mod persistence;
pub mod telemetry;

pub use config::HarvestConfig;
pub use github::{
    CredentialPool, HistoryGateway, IntakeError, OctocrabGateway, PersonalAccessToken,
    PullRequestRecord, RepositoryLocator,
};
pub use harvest::{
    AbortSignal, FetchReport, FetchStrategy, HarvestContext, HarvestSettings, JobStatus,
    RecordSink, SyncCoordinator,
};
pub use persistence::{CheckpointStore, SnapshotStore};
pub use telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
