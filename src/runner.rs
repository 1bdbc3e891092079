use crate::generator::PayloadGenerator;
use crate::record::IterationContext;
use crate::sink::IngestSink;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{spawn_blocking, JoinSet};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Per-VU iterations executor: `vus` virtual users each run exactly
/// `iterations` iterations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub vus: u64,
    pub iterations: u64,
    /// Pause after every iteration.
    #[serde(with = "humantime_serde")]
    pub think_time: Duration,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            vus: 50,
            iterations: 2000,
            think_time: Duration::ZERO,
        }
    }
}

/// Counters shared by all virtual users of a run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub iterations: AtomicU64,
    pub checks_passed: AtomicU64,
    pub checks_failed: AtomicU64,
    /// Pushes that never got a status (connection, timeout, serialization).
    pub transport_errors: AtomicU64,
    pub bytes_sent: AtomicU64,
}

/// Final numbers of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub transport_errors: u64,
    pub bytes_sent: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.checks_failed == 0
    }
}

/// Drive `scenario` against `sink`.
///
/// Every virtual user runs on its own Tokio task with a private RNG and
/// builds its batches on the blocking pool. A push
/// whose status differs from [`IngestSink::expected_status`], or that fails
/// outright, is counted as a failed check and the virtual user moves on to
/// its next iteration. There are no retries.
pub async fn run(
    sink: Arc<dyn IngestSink>,
    payload: Arc<PayloadGenerator>,
    scenario: Scenario,
) -> RunSummary {
    let stats = Arc::new(RunStats::default());
    let start = Instant::now();

    info!(
        backend = sink.name(),
        vus = scenario.vus,
        iterations = scenario.iterations,
        shape = %payload.shape(),
        "starting load run"
    );

    let mut tasks = JoinSet::new();
    for vu in 1..=scenario.vus {
        let sink = Arc::clone(&sink);
        let payload = Arc::clone(&payload);
        let stats = Arc::clone(&stats);
        let scenario = scenario.clone();
        tasks.spawn(run_vu(vu, sink, payload, scenario, stats));
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "virtual user task aborted");
        }
    }

    let summary = RunSummary {
        iterations: stats.iterations.load(Ordering::Relaxed),
        checks_passed: stats.checks_passed.load(Ordering::Relaxed),
        checks_failed: stats.checks_failed.load(Ordering::Relaxed),
        transport_errors: stats.transport_errors.load(Ordering::Relaxed),
        bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };

    info!(
        iterations = summary.iterations,
        checks_passed = summary.checks_passed,
        checks_failed = summary.checks_failed,
        transport_errors = summary.transport_errors,
        bytes_sent = summary.bytes_sent,
        elapsed = ?summary.elapsed,
        "load run finished"
    );

    summary
}

async fn run_vu(
    vu: u64,
    sink: Arc<dyn IngestSink>,
    payload: Arc<PayloadGenerator>,
    scenario: Scenario,
    stats: Arc<RunStats>,
) {
    let mut rng = SmallRng::seed_from_u64(rand::random());
    let expected = sink.expected_status();

    for iteration in 0..scenario.iterations {
        let ctx = IterationContext::new(vu, iteration, scenario.iterations);
        // Building a batch is CPU-bound, keep it off the async workers.
        let seed: u64 = rng.random();
        let generator = Arc::clone(&payload);
        let generated = spawn_blocking(move || {
            generator.generate(&ctx, &mut SmallRng::seed_from_u64(seed))
        })
        .await;
        let batch = match generated {
            Ok(batch) => batch,
            Err(e) => {
                stats.checks_failed.fetch_add(1, Ordering::Relaxed);
                stats.iterations.fetch_add(1, Ordering::Relaxed);
                warn!(vu, iteration, error = %e, "batch generation aborted");
                continue;
            }
        };

        match sink.push(&batch).await {
            Ok(outcome) => {
                stats.bytes_sent.fetch_add(outcome.bytes as u64, Ordering::Relaxed);
                if outcome.status == expected {
                    stats.checks_passed.fetch_add(1, Ordering::Relaxed);
                    debug!(vu, iteration, status = outcome.status, latency = ?outcome.latency, "push accepted");
                } else {
                    stats.checks_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(vu, iteration, status = outcome.status, expected, "unexpected push status");
                }
            }
            Err(e) => {
                stats.checks_failed.fetch_add(1, Ordering::Relaxed);
                stats.transport_errors.fetch_add(1, Ordering::Relaxed);
                warn!(vu, iteration, error = %e, "push failed");
            }
        }
        stats.iterations.fetch_add(1, Ordering::Relaxed);

        if !scenario.think_time.is_zero() {
            sleep(scenario.think_time).await;
        }
    }
}
