use std::sync::Arc;
use std::time::Instant;

use log_ingest_loadgen::generator::{BatchGenerator, GeneratorConfig, PayloadGenerator};
use log_ingest_loadgen::noop_sink::NoopSink;
use log_ingest_loadgen::runner::{run, Scenario};
use log_ingest_loadgen::schema::{FieldSpec, LogLineFormat, Schema, ValueGenerator};

/// Flat-JSON generation with a hand-written schema: a handful of labels, a
/// per-iteration pod name and a short logfmt line.
#[tokio::main]
async fn main() {
    let schema = Schema::new(vec![
        FieldSpec::new("service", ValueGenerator::constant("checkout")),
        FieldSpec::new("region", ValueGenerator::constant("eu-west-1")),
        FieldSpec::new("pod", ValueGenerator::unique_id("checkout-")),
        FieldSpec::new("trace_id", ValueGenerator::random_string("", 32)),
        FieldSpec::new("request_id", ValueGenerator::UuidLike),
        FieldSpec::new("message", ValueGenerator::log_line(LogLineFormat::Logfmt)),
    ]);

    let config = GeneratorConfig { batch_size: 5_000, field_count: 8 };
    let generator = BatchGenerator::flat_json(&config).with_schema(schema);
    let payload = Arc::new(PayloadGenerator::Kubernetes(generator));

    let sink = Arc::new(NoopSink::new(200));
    let scenario = Scenario { vus: 4, iterations: 20, ..Scenario::default() };

    let start = Instant::now();
    let summary = run(sink, payload, scenario).await;
    let elapsed = start.elapsed();

    let records = summary.iterations * config.batch_size as u64;
    println!("custom schema: built {} records ({} bytes) in {:?} (~{:.0} rec/s)",
        records,
        summary.bytes_sent,
        elapsed,
        records as f64 / elapsed.as_secs_f64()
    );
}
