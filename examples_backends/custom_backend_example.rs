use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log_ingest_loadgen::generator::{BatchGenerator, GeneratorConfig, PayloadGenerator};
use log_ingest_loadgen::record::Batch;
use log_ingest_loadgen::runner::{run, Scenario};
use log_ingest_loadgen::sink::{IngestSink, PushError, PushOutcome};

/// Example of load testing a backend this crate has no built-in sink for
/// by implementing `IngestSink` directly. Here the "backend" just prints
/// the size of each body.
struct StdoutSink;

#[async_trait]
impl IngestSink for StdoutSink {
    async fn push(&self, batch: &Batch) -> Result<PushOutcome, PushError> {
        let body = batch.to_json()?;
        println!("[stdout-sink] {} entries, {} bytes", batch.len(), body.len());
        Ok(PushOutcome { status: 200, latency: Duration::ZERO, bytes: body.len() })
    }

    fn expected_status(&self) -> u16 {
        200
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

#[tokio::main]
async fn main() {
    let sink: Arc<dyn IngestSink> = Arc::new(StdoutSink);
    let config = GeneratorConfig { batch_size: 10, ..GeneratorConfig::default() };
    let payload = Arc::new(PayloadGenerator::Kubernetes(BatchGenerator::flat_json(&config)));

    run(sink, payload, Scenario { vus: 2, iterations: 3, ..Scenario::default() }).await;
}
