//! Hand-off of fetched records to whatever stores them downstream.

use crate::github::models::PullRequestRecord;

/// Receives each record as soon as a job has it.
///
/// The serial fetcher calls the sink before writing the checkpoint entry for
/// the record, so a crash never marks an item fetched that the sink has not
/// seen. Records fetched by an earlier, interrupted run reach the sink in
/// that run and are not repeated on resume.
pub trait RecordSink: Send + Sync {
    /// Accepts one record.
    fn accept(&self, record: &PullRequestRecord);
}

/// Sink that ignores records; the caller only wants the returned report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecordSink;

impl RecordSink for NoopRecordSink {
    fn accept(&self, _record: &PullRequestRecord) {}
}

/// Sink that keeps every record for later inspection.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct CollectingRecordSink {
    records: parking_lot::Mutex<Vec<PullRequestRecord>>,
}

#[cfg(any(test, feature = "test-support"))]
impl CollectingRecordSink {
    /// Numbers of the records accepted so far, in arrival order.
    #[must_use]
    pub fn numbers(&self) -> Vec<u64> {
        self.records.lock().iter().map(|record| record.number).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RecordSink for CollectingRecordSink {
    fn accept(&self, record: &PullRequestRecord) {
        self.records.lock().push(record.clone());
    }
}
