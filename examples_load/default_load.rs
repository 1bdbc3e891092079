use std::sync::Arc;
use std::time::Instant;

use log_ingest_loadgen::generator::{BatchGenerator, GeneratorConfig, PayloadGenerator};
use log_ingest_loadgen::logging::{init_logging, LogConfig};
use log_ingest_loadgen::noop_sink::NoopSink;
use log_ingest_loadgen::runner::{run, Scenario};

/// Measures how fast the default Loki-shaped batches can be generated and
/// serialized when nothing is sent over the network.
#[tokio::main]
async fn main() {
    let _ = init_logging(&LogConfig::default());

    let sink = Arc::new(NoopSink::default());
    let payload = Arc::new(PayloadGenerator::Kubernetes(BatchGenerator::loki_streams(
        &GeneratorConfig::default(),
    )));
    let scenario = Scenario { vus: 8, iterations: 50, ..Scenario::default() };

    let start = Instant::now();
    let summary = run(sink.clone(), payload, scenario).await;
    let elapsed = start.elapsed();

    let records = summary.iterations * 1000;
    println!("default config: built {} batches ({} records, {} bytes) in {:?} (~{:.0} rec/s)",
        sink.batches(),
        records,
        summary.bytes_sent,
        elapsed,
        records as f64 / elapsed.as_secs_f64()
    );
}
