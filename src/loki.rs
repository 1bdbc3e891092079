use crate::backend::{BackendKind, VictoriaTenant};
use crate::record::{Batch, WireShape};
use crate::sink::{IngestSink, PushError, PushOutcome};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Instant;

/// How a push is scoped to a tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TenantHeaders {
    /// Single-tenant mode, no header.
    None,
    /// Loki multi-tenancy: `X-Scope-OrgID`.
    ScopeOrgId(String),
    /// VictoriaLogs multi-tenancy: `AccountID` and `ProjectID`.
    Victoria(VictoriaTenant),
}

/// Sink for the Loki push API, also used for VictoriaLogs' Loki-compatible
/// endpoint.
#[derive(Clone, Debug)]
pub struct LokiSink {
    client: Client,
    kind: BackendKind,
    /// Full push URL, e.g. "http://localhost:3100/loki/api/v1/push".
    url: String,
    tenant: TenantHeaders,
}

impl LokiSink {
    pub fn new(kind: BackendKind, url: String, tenant: TenantHeaders, client: Client) -> Self {
        LokiSink { client, kind, url, tenant }
    }
}

#[async_trait]
impl IngestSink for LokiSink {
    async fn push(&self, batch: &Batch) -> Result<PushOutcome, PushError> {
        if batch.shape() != WireShape::Streams {
            return Err(PushError::ShapeMismatch {
                backend: self.name(),
                expected: WireShape::Streams,
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
        request = match &self.tenant {
            TenantHeaders::None => request,
            TenantHeaders::ScopeOrgId(tenant) => request.header("X-Scope-OrgID", tenant),
            TenantHeaders::Victoria(tenant) => request
                .header("AccountID", tenant.account_id.to_string())
                .header("ProjectID", tenant.project_id.to_string()),
        };

        let start = Instant::now();
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        // Drain the body so the connection goes back to the pool.
        resp.bytes().await?;
        let latency = start.elapsed();

        Ok(PushOutcome { status, latency, bytes })
    }

    fn expected_status(&self) -> u16 {
        self.kind.expected_status()
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}
