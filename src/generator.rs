//! Builds one [`Batch`] per iteration.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::record::{Batch, IterationContext, LogRecord, StreamEntry, WireShape};
use crate::schema::{LogLineFormat, Schema};

/// Size knobs shared by the kubernetes payload generators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Records (flat) or streams (Loki) per iteration.
    pub batch_size: usize,
    /// Random `fieldN` pairs per log line.
    pub field_count: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { batch_size: 1000, field_count: 24 }
    }
}

/// Renders a [`Schema`] `batch_size` times into the requested wire shape.
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    shape: WireShape,
    schema: Schema,
    line_format: LogLineFormat,
    batch_size: usize,
    field_count: usize,
}

impl BatchGenerator {
    /// Flat documents with the kubernetes schema and a logfmt `log` field.
    pub fn flat_json(config: &GeneratorConfig) -> Self {
        Self {
            shape: WireShape::Flat,
            schema: Schema::kubernetes_flat(),
            line_format: LogLineFormat::Logfmt,
            batch_size: config.batch_size,
            field_count: config.field_count,
        }
    }

    /// One Loki stream per line, kubernetes fields as labels and a JSON line.
    pub fn loki_streams(config: &GeneratorConfig) -> Self {
        Self {
            shape: WireShape::Streams,
            schema: Schema::kubernetes_labels(),
            line_format: LogLineFormat::Json,
            batch_size: config.batch_size,
            field_count: config.field_count,
        }
    }

    pub fn for_shape(shape: WireShape, config: &GeneratorConfig) -> Self {
        match shape {
            WireShape::Flat => Self::flat_json(config),
            WireShape::Streams => Self::loki_streams(config),
        }
    }

    /// Replace the built-in kubernetes schema. For the Loki shape the
    /// fields become labels, see [`Schema::into_labels`].
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = match self.shape {
            WireShape::Flat => schema,
            WireShape::Streams => schema.into_labels(),
        };
        self
    }

    pub fn shape(&self) -> WireShape {
        self.shape
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn generate<R: Rng + ?Sized>(&self, ctx: &IterationContext, rng: &mut R) -> Batch {
        match self.shape {
            WireShape::Flat => {
                let records = (0..self.batch_size)
                    .map(|_| LogRecord(self.schema.render(ctx, rng, self.field_count, Utc::now())))
                    .collect();
                Batch::Flat(records)
            }
            WireShape::Streams => {
                let streams = (0..self.batch_size)
                    .map(|_| {
                        let now = Utc::now();
                        let stream = self.schema.render(ctx, rng, self.field_count, now);
                        let line = self.line_format.render(rng, self.field_count, now);
                        StreamEntry { stream, values: vec![(epoch_nanos(now).to_string(), line)] }
                    })
                    .collect();
                Batch::Streams(streams)
            }
        }
    }
}

/// Nanoseconds since the epoch at millisecond resolution, as Loki expects
/// for the first element of every `values` pair.
pub fn epoch_nanos(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().saturating_mul(1_000_000)
}

const OS_POOL: &[&str] = &["darwin", "linux", "windows"];
const NAMESPACE_POOL: &[&str] = &["loki-prod-001", "loki-prod-002", "loki-prod-003", "loki-dev-001"];
const FORMAT_POOL: &[(&str, LogLineFormat)] = &[("json", LogLineFormat::Json), ("logfmt", LogLineFormat::Logfmt)];

/// Byte-bounded push: a fixed number of streams filled with lines until the
/// uncompressed line bytes reach a target drawn from `[min_bytes, max_bytes]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedGenerator {
    pub streams: usize,
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub field_count: usize,
}

impl Default for ParameterizedGenerator {
    fn default() -> Self {
        Self {
            streams: 10,
            min_bytes: 800 * 1024,
            max_bytes: 2 * 1024 * 1024,
            field_count: 24,
        }
    }
}

impl ParameterizedGenerator {
    /// Stops at the first line that reaches the target size, so the total
    /// overshoots the target by less than one line.
    pub fn generate<R: Rng + ?Sized>(&self, ctx: &IterationContext, rng: &mut R) -> Batch {
        let stream_count = self.streams.max(1);
        let target = if self.min_bytes >= self.max_bytes {
            self.max_bytes
        } else {
            rng.random_range(self.min_bytes..=self.max_bytes)
        };

        let mut formats = Vec::with_capacity(stream_count);
        let mut entries: Vec<StreamEntry> = (0..stream_count)
            .map(|i| {
                let (format_name, format) = FORMAT_POOL[rng.random_range(0..FORMAT_POOL.len())];
                formats.push(format);

                let mut labels = Map::new();
                labels.insert("format".into(), Value::from(format_name));
                labels.insert("os".into(), Value::from(*OS_POOL.choose(rng).unwrap_or(&"linux")));
                labels.insert(
                    "namespace".into(),
                    Value::from(*NAMESPACE_POOL.choose(rng).unwrap_or(&"loki-prod-001")),
                );
                labels.insert("instance".into(), Value::from(format!("loadgen-{}", ctx.vu)));
                labels.insert("stream_id".into(), Value::from(i.to_string()));
                StreamEntry { stream: labels, values: Vec::new() }
            })
            .collect();

        let base = epoch_nanos(Utc::now());
        let mut total = 0u64;
        let mut line_no = 0usize;
        while total < target {
            let idx = line_no % stream_count;
            let now = Utc::now();
            let line = formats[idx].render(rng, self.field_count, now);
            total += line.len() as u64;
            let ts = base + line_no as i64;
            entries[idx].values.push((ts.to_string(), line));
            line_no += 1;
        }

        Batch::Streams(entries)
    }
}

/// What a virtual user generates each iteration.
#[derive(Debug, Clone)]
pub enum PayloadGenerator {
    Kubernetes(BatchGenerator),
    Parameterized(ParameterizedGenerator),
}

impl PayloadGenerator {
    pub fn shape(&self) -> WireShape {
        match self {
            PayloadGenerator::Kubernetes(generator) => generator.shape(),
            PayloadGenerator::Parameterized(_) => WireShape::Streams,
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, ctx: &IterationContext, rng: &mut R) -> Batch {
        match self {
            PayloadGenerator::Kubernetes(generator) => generator.generate(ctx, rng),
            PayloadGenerator::Parameterized(generator) => generator.generate(ctx, rng),
        }
    }
}
