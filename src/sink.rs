use crate::record::{Batch, WireShape};
use async_trait::async_trait;
use std::time::Duration;

/// Result of a push that reached the backend, whatever the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// HTTP status returned by the ingestion endpoint.
    pub status: u16,
    /// Time from sending the request until the response body was fully read.
    pub latency: Duration,
    /// Size of the serialized request body.
    pub bytes: usize,
}

/// Errors that prevented a push from producing a status code.
#[derive(thiserror::Error, Debug)]
pub enum PushError {
    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{backend} expects a {expected} payload, got {actual}")]
    ShapeMismatch {
        backend: &'static str,
        expected: WireShape,
        actual: WireShape,
    },
}

/// Destination for generated [`Batch`]es.
///
/// Implementations own the HTTP details of one ingestion backend: endpoint,
/// headers and authentication. A push is considered delivered once a
/// response status is known; judging that status is left to the runner via
/// [`IngestSink::expected_status`].
#[async_trait]
pub trait IngestSink: Send + Sync {
    /// Serialize `batch` and send it in a single request.
    ///
    /// **Returns**
    /// - `Ok(outcome)` with the response status, including non-2xx ones.
    /// - `Err(..)` if the batch could not be serialized, has the wrong
    ///   shape for this backend, or the request never got a response
    ///   (connection refused, timeout).
    ///
    /// Nothing is retried.
    async fn push(&self, batch: &Batch) -> Result<PushOutcome, PushError>;

    /// Status code a healthy backend answers a successful push with.
    fn expected_status(&self) -> u16;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
