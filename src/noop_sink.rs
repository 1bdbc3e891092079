use crate::record::Batch;
use crate::sink::{IngestSink, PushError, PushOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A sink that serializes and then drops every batch.
///
/// Useful for measuring generator throughput without any network I/O, and
/// for tests that only care about what the runner does with outcomes.
#[derive(Debug)]
pub struct NoopSink {
    status: u16,
    batches: AtomicU64,
}

impl NoopSink {
    /// Answer every push with `status`.
    pub fn new(status: u16) -> Self {
        Self { status, batches: AtomicU64::new(0) }
    }

    /// Number of batches pushed so far.
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

impl Default for NoopSink {
    fn default() -> Self {
        Self::new(204)
    }
}

#[async_trait]
impl IngestSink for NoopSink {
    async fn push(&self, batch: &Batch) -> Result<PushOutcome, PushError> {
        let bytes = batch.to_json()?.len();
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(PushOutcome { status: self.status, latency: Duration::ZERO, bytes })
    }

    fn expected_status(&self) -> u16 {
        self.status
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
