//! Pipeline telemetry events and sinks.
//!
//! Fetch jobs run for hours, so the interesting operational signals (which
//! plan the coordinator chose, when a credential ran dry, how long abuse
//! backoffs lasted) are emitted as structured events alongside the tracing
//! logs. Sinks decide where they go.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// The coordinator chose how to satisfy a request.
    FetchPlanned {
        /// Repository in `owner/name` form.
        repository: String,
        /// `cache_hit`, `incremental` or `full`.
        plan: String,
    },
    /// A credential's primary quota ran out.
    CredentialExhausted {
        /// Zero-based position of the credential in the pool.
        credential: usize,
        /// RFC 3339 reset instant, when known.
        reset_at: Option<String>,
    },
    /// A secondary rate limit forced a pause.
    AbuseBackoff {
        /// Repository in `owner/name` form.
        repository: String,
        /// Pull request being fetched, if the call was per item.
        number: Option<u64>,
        /// Seconds slept before retrying.
        wait_seconds: u64,
    },
    /// An item could not be fetched and was skipped.
    ItemSkipped {
        /// Repository in `owner/name` form.
        repository: String,
        /// Pull request number.
        number: u64,
        /// Error description.
        reason: String,
    },
    /// A bulk page failed and ended the page loop.
    PageFailed {
        /// Repository in `owner/name` form.
        repository: String,
        /// One-based page index within the job.
        page: u32,
        /// Error description.
        reason: String,
    },
    /// Check-run augmentation did not run.
    AugmentationSkipped {
        /// Repository in `owner/name` form.
        repository: String,
        /// Calls augmentation would have needed.
        needed: usize,
        /// Quota left across the pool.
        remaining: u64,
    },
    /// A fetch job ended.
    JobFinished {
        /// Repository in `owner/name` form.
        repository: String,
        /// Final job status label.
        status: String,
        /// Records collected by the job.
        records: usize,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Sink that keeps events in memory for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingTelemetrySink {
    events: parking_lot::Mutex<Vec<TelemetryEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingTelemetrySink {
    /// Drains the recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<TelemetryEvent> {
        self.events.lock().drain(..).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TelemetrySink for RecordingTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}
