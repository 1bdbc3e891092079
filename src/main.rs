//! Load generator that pushes synthetic Kubernetes logs to Loki,
//! VictoriaLogs or OpenObserve.
//!
//! Configuration is layered: built-in defaults, then the YAML file given
//! with `--config`, then `LOADGEN_*` environment variables, then the
//! command line flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use argh::FromArgs;

use log_ingest_loadgen::backend::make_sink_from_config;
use log_ingest_loadgen::config::Config;
use log_ingest_loadgen::logging::init_logging;
use log_ingest_loadgen::noop_sink::NoopSink;
use log_ingest_loadgen::runner::run;
use log_ingest_loadgen::sink::IngestSink;

/// Push synthetic Kubernetes log batches to a log ingestion backend
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// backend DSN, e.g. victorialogs://localhost:9428
    #[argh(option)]
    dsn: Option<String>,

    /// number of virtual users
    #[argh(option)]
    vus: Option<u64>,

    /// iterations per virtual user
    #[argh(option)]
    iterations: Option<u64>,

    /// generate and serialize batches without sending them
    #[argh(switch)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => Config::load(path).context("failed to load config file")?,
        None => Config::default(),
    };
    config.apply_env().context("failed to apply environment overrides")?;
    if let Some(dsn) = args.dsn {
        config.dsn = dsn;
    }
    if let Some(vus) = args.vus {
        config.scenario.vus = vus;
    }
    if let Some(iterations) = args.iterations {
        config.scenario.iterations = iterations;
    }

    init_logging(&config.log).context("failed to initialize logging")?;

    let backend = config.validate().context("invalid configuration")?;
    let sink: Arc<dyn IngestSink> = if args.dry_run {
        Arc::new(NoopSink::new(backend.expected_status()))
    } else {
        make_sink_from_config(&backend, &config.client())
            .with_context(|| format!("failed to create {} sink", backend.kind))?
    };
    tracing::info!(backend = %backend.kind, url = %backend.push_url(), dry_run = args.dry_run, "sink ready");

    let payload = Arc::new(config.payload_generator(backend.wire_shape()));
    let summary = run(sink, payload, config.scenario.clone()).await;

    println!(
        "{} iterations in {:.2?}: {} checks passed, {} failed ({} transport errors), {} bytes sent",
        summary.iterations,
        summary.elapsed,
        summary.checks_passed,
        summary.checks_failed,
        summary.transport_errors,
        summary.bytes_sent,
    );

    Ok(())
}
