use crate::backend::{BackendKind, Credentials};
use crate::record::{Batch, WireShape};
use crate::sink::{IngestSink, PushError, PushOutcome};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Instant;

/// Configuration for [`OpenObserveSink`].
///
/// The sink talks to OpenObserve over its JSON bulk endpoint, posting each
/// batch as a single array of flat documents.
#[derive(Clone, Debug)]
pub struct OpenObserveConfig {
    /// Full ingestion URL, e.g. "http://127.0.0.1:5080/api/default/quickstart1/_json"
    pub url: String,
    pub credentials: Option<Credentials>,
}

/// OpenObserve implementation of [`IngestSink`].
#[derive(Clone, Debug)]
pub struct OpenObserveSink {
    client: Client,
    url: String,
    authorization: Option<String>,
}

impl OpenObserveSink {
    /// Construct a new sink instance.
    ///
    /// **Parameters**
    /// - `config`: [`OpenObserveConfig`] with the target URL and optional
    ///   basic-auth login.
    /// - `client`: HTTP client, normally built by
    ///   [`ClientConfig::build_client`](crate::backend::ClientConfig::build_client)
    ///   so the per-request timeout applies.
    pub fn new(config: OpenObserveConfig, client: Client) -> Self {
        let authorization = config.credentials.as_ref().map(Credentials::basic_auth_header);
        Self { client, url: config.url, authorization }
    }
}

#[async_trait]
impl IngestSink for OpenObserveSink {
    async fn push(&self, batch: &Batch) -> Result<PushOutcome, PushError> {
        if batch.shape() != WireShape::Flat {
            return Err(PushError::ShapeMismatch {
                backend: self.name(),
                expected: WireShape::Flat,
                actual: batch.shape(),
            });
        }

        let body = batch.to_json()?;
        let bytes = body.len();

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let start = Instant::now();
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        // Drain the body so the connection goes back to the pool.
        resp.bytes().await?;
        let latency = start.elapsed();

        Ok(PushOutcome { status, latency, bytes })
    }

    fn expected_status(&self) -> u16 {
        BackendKind::OpenObserve.expected_status()
    }

    fn name(&self) -> &'static str {
        BackendKind::OpenObserve.name()
    }
}
