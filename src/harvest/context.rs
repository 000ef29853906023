//! Borrowed collaborators shared by every fetch job.

use crate::github::credential_pool::CredentialPool;
use crate::github::gateway::HistoryGateway;
use crate::persistence::CheckpointStore;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

use super::abort::AbortSignal;
use super::settings::HarvestSettings;
use super::sink::{NoopRecordSink, RecordSink};

/// Everything a fetcher needs to run a job.
///
/// The context only borrows; the caller owns the pool, stores and sinks and
/// may share them across jobs.
pub struct HarvestContext<'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    pub(crate) gateway: &'ctx Gateway,
    pub(crate) pool: &'ctx CredentialPool,
    pub(crate) checkpoints: &'ctx CheckpointStore,
    pub(crate) settings: &'ctx HarvestSettings,
    pub(crate) sink: &'ctx dyn RecordSink,
    pub(crate) telemetry: &'ctx dyn TelemetrySink,
    pub(crate) abort: AbortSignal,
}

impl<'ctx, Gateway> HarvestContext<'ctx, Gateway>
where
    Gateway: HistoryGateway + ?Sized,
{
    /// Creates a context with no-op sinks and a fresh abort signal.
    #[must_use]
    pub fn new(
        gateway: &'ctx Gateway,
        pool: &'ctx CredentialPool,
        checkpoints: &'ctx CheckpointStore,
        settings: &'ctx HarvestSettings,
    ) -> Self {
        Self {
            gateway,
            pool,
            checkpoints,
            settings,
            sink: &NoopRecordSink,
            telemetry: &NoopTelemetrySink,
            abort: AbortSignal::new(),
        }
    }

    /// Routes fetched records to `sink`.
    #[must_use]
    pub fn with_record_sink(mut self, sink: &'ctx dyn RecordSink) -> Self {
        self.sink = sink;
        self
    }

    /// Routes telemetry events to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: &'ctx dyn TelemetrySink) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Uses `abort` as the job's cancellation signal.
    #[must_use]
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// The credential pool jobs draw from.
    #[must_use]
    pub const fn pool(&self) -> &'ctx CredentialPool {
        self.pool
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &'ctx HarvestSettings {
        self.settings
    }

    /// Handle to the job's cancellation signal.
    #[must_use]
    pub const fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub(crate) fn emit(&self, event: TelemetryEvent) {
        self.telemetry.record(event);
    }
}
