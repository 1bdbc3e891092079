use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Position of one iteration within a run.
///
/// `vu` is 1-based and `iteration` is 0-based, matching how virtual users
/// are numbered by the runner. As long as `iteration < iterations_per_vu`
/// every pair maps to a distinct [`unique_id`](Self::unique_id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IterationContext {
    pub vu: u64,
    pub iteration: u64,
    pub iterations_per_vu: u64,
}

impl IterationContext {
    pub fn new(vu: u64, iteration: u64, iterations_per_vu: u64) -> Self {
        Self { vu, iteration, iterations_per_vu }
    }

    /// `(vu - 1) * iterations_per_vu + iteration`.
    pub fn unique_id(&self) -> u64 {
        self.vu.saturating_sub(1) * self.iterations_per_vu + self.iteration
    }
}

/// One flat log document, every field at the top level.
///
/// Field order is kept as inserted so the serialized body matches the
/// schema's declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(pub Map<String, Value>);

impl LogRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A Loki stream: a label set plus `[timestamp_ns, line]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub stream: Map<String, Value>,
    pub values: Vec<(String, String)>,
}

impl StreamEntry {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.stream.get(name).and_then(Value::as_str)
    }

    /// Total bytes of the log lines carried by this stream.
    pub fn line_bytes(&self) -> usize {
        self.values.iter().map(|(_, line)| line.len()).sum()
    }
}

/// Wire shape a backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// `[{...}, {...}]`
    Flat,
    /// `{"streams":[{"stream":{...},"values":[[ts, line]]}]}`
    Streams,
}

impl fmt::Display for WireShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireShape::Flat => f.write_str("flat-json"),
            WireShape::Streams => f.write_str("loki-streams"),
        }
    }
}

/// Everything pushed by a single iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Flat(Vec<LogRecord>),
    Streams(Vec<StreamEntry>),
}

#[derive(Serialize)]
struct PushRequestRef<'a> {
    streams: &'a [StreamEntry],
}

#[derive(Deserialize)]
struct PushRequest {
    streams: Vec<StreamEntry>,
}

impl Batch {
    pub fn shape(&self) -> WireShape {
        match self {
            Batch::Flat(_) => WireShape::Flat,
            Batch::Streams(_) => WireShape::Streams,
        }
    }

    /// Number of records, or of streams for the Loki shape.
    pub fn len(&self) -> usize {
        match self {
            Batch::Flat(records) => records.len(),
            Batch::Streams(streams) => streams.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize into the request body for the batch's wire shape.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Batch::Flat(records) => serde_json::to_vec(records),
            Batch::Streams(streams) => serde_json::to_vec(&PushRequestRef { streams }),
        }
    }

    /// Parse a request body produced by [`Batch::to_json`].
    pub fn from_json(shape: WireShape, body: &[u8]) -> serde_json::Result<Self> {
        match shape {
            WireShape::Flat => serde_json::from_slice(body).map(Batch::Flat),
            WireShape::Streams => serde_json::from_slice::<PushRequest>(body)
                .map(|req| Batch::Streams(req.streams)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unique_id_matches_formula() {
        let ctx = IterationContext::new(3, 5, 2000);
        assert_eq!(ctx.unique_id(), 4005);

        assert_eq!(IterationContext::new(1, 0, 2000).unique_id(), 0);
        assert_eq!(IterationContext::new(1, 1999, 2000).unique_id(), 1999);
        assert_eq!(IterationContext::new(2, 0, 2000).unique_id(), 2000);
    }

    #[test]
    fn unique_ids_never_collide_across_vus() {
        let vus = 50;
        let iterations = 200;
        let mut seen = HashSet::new();
        for vu in 1..=vus {
            for iteration in 0..iterations {
                let id = IterationContext::new(vu, iteration, iterations).unique_id();
                assert!(seen.insert(id), "duplicate id {id} for vu {vu} iter {iteration}");
            }
        }
        assert_eq!(seen.len() as u64, vus * iterations);
    }

    #[test]
    fn streams_batch_serializes_as_push_request() {
        let mut stream = Map::new();
        stream.insert("app".into(), Value::from("prometheus"));
        let batch = Batch::Streams(vec![StreamEntry {
            stream,
            values: vec![("1700000000000000000".into(), "hello".into())],
        }]);

        let body = String::from_utf8(batch.to_json().unwrap()).unwrap();
        assert_eq!(
            body,
            r#"{"streams":[{"stream":{"app":"prometheus"},"values":[["1700000000000000000","hello"]]}]}"#
        );
    }

    #[test]
    fn flat_batch_keeps_field_order() {
        let mut fields = Map::new();
        fields.insert("zeta".into(), Value::from("1"));
        fields.insert("alpha".into(), Value::from("2"));
        let batch = Batch::Flat(vec![LogRecord(fields)]);

        let body = String::from_utf8(batch.to_json().unwrap()).unwrap();
        assert_eq!(body, r#"[{"zeta":"1","alpha":"2"}]"#);

        let parsed = Batch::from_json(WireShape::Flat, body.as_bytes()).unwrap();
        assert_eq!(parsed, batch);
    }
}
