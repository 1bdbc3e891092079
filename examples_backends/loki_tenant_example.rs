use std::sync::Arc;
use std::time::Duration;

use log_ingest_loadgen::backend::{make_sink_from_config, parse_dsn, ClientConfig};
use log_ingest_loadgen::generator::{ParameterizedGenerator, PayloadGenerator};
use log_ingest_loadgen::logging::{init_logging, LogConfig};
use log_ingest_loadgen::runner::{run, Scenario};

/// A single tenant-scoped push of 10 streams carrying 800KiB..2MiB of
/// uncompressed lines, followed by a one second pause.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::default())?;

    let backend = parse_dsn("victorialogs://42@localhost:9428")?;
    let client = ClientConfig { timeout: Duration::from_secs(10), ..ClientConfig::default() };
    let sink = make_sink_from_config(&backend, &client)?;
    let payload = Arc::new(PayloadGenerator::Parameterized(ParameterizedGenerator::default()));

    let scenario = Scenario { vus: 1, iterations: 1, think_time: Duration::from_secs(1) };
    let summary = run(sink, payload, scenario).await;
    println!("successful write: {}", summary.all_passed());
    Ok(())
}
