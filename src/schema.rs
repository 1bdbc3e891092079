//! Declarative description of the fields carried by every generated record.
//!
//! A [`Schema`] is an ordered list of field names, each paired with a
//! [`ValueGenerator`]. The flat-JSON and Loki-shaped payloads render the same
//! kind of schema and only differ in where the rendered fields end up.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::random::{push_random, random_octet, uuid_like};
use crate::record::IterationContext;

/// How a single field value is produced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueGenerator {
    /// Same literal for every record of every iteration.
    Constant { value: String },
    /// `prefix` followed by the iteration's unique id.
    UniqueId { prefix: String },
    /// `prefix` followed by `len` random alphanumeric characters.
    RandomString {
        #[serde(default)]
        prefix: String,
        len: usize,
    },
    /// `prefix`, a random octet, then `suffix`.
    RandomHost { prefix: String, suffix: String },
    /// A UUID-shaped identifier built from random alphanumeric groups.
    UuidLike,
    /// Timestamp followed by `field0..fieldN` random pairs.
    LogLine { format: LogLineFormat },
}

impl ValueGenerator {
    pub fn constant(value: impl Into<String>) -> Self {
        ValueGenerator::Constant { value: value.into() }
    }

    pub fn unique_id(prefix: impl Into<String>) -> Self {
        ValueGenerator::UniqueId { prefix: prefix.into() }
    }

    pub fn random_string(prefix: impl Into<String>, len: usize) -> Self {
        ValueGenerator::RandomString { prefix: prefix.into(), len }
    }

    pub fn random_host(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        ValueGenerator::RandomHost { prefix: prefix.into(), suffix: suffix.into() }
    }

    pub fn log_line(format: LogLineFormat) -> Self {
        ValueGenerator::LogLine { format }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        ctx: &IterationContext,
        rng: &mut R,
        field_count: usize,
        now: DateTime<Utc>,
    ) -> String {
        match self {
            ValueGenerator::Constant { value } => value.clone(),
            ValueGenerator::UniqueId { prefix } => format!("{}{}", prefix, ctx.unique_id()),
            ValueGenerator::RandomString { prefix, len } => {
                let mut value = String::with_capacity(prefix.len() + len);
                value.push_str(prefix);
                push_random(rng, &mut value, *len);
                value
            }
            ValueGenerator::RandomHost { prefix, suffix } => {
                format!("{}{}{}", prefix, random_octet(rng), suffix)
            }
            ValueGenerator::UuidLike => uuid_like(rng),
            ValueGenerator::LogLine { format } => format.render(rng, field_count, now),
        }
    }
}

/// Layout of a synthesized free-text log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLineFormat {
    /// `ts=2024-01-01T00:00:00.000Z field0=abc... field1=...`
    Logfmt,
    /// `{"ts":"2024-01-01T00:00:00.000Z","field0":"abc...",...}`
    Json,
}

/// Length of every random value inside a log line.
pub const LOG_FIELD_VALUE_LEN: usize = 10;

impl LogLineFormat {
    pub fn render<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        field_count: usize,
        now: DateTime<Utc>,
    ) -> String {
        let ts = iso_timestamp(now);
        // "field" + index + separators + value
        let mut line = String::with_capacity(ts.len() + 8 + field_count * (LOG_FIELD_VALUE_LEN + 16));

        match self {
            LogLineFormat::Logfmt => {
                line.push_str("ts=");
                line.push_str(&ts);
                for i in 0..field_count {
                    line.push_str(" field");
                    line.push_str(&i.to_string());
                    line.push('=');
                    push_random(rng, &mut line, LOG_FIELD_VALUE_LEN);
                }
            }
            LogLineFormat::Json => {
                // Keys and values are plain alphanumerics, nothing needs escaping.
                line.push_str("{\"ts\":\"");
                line.push_str(&ts);
                line.push('"');
                for i in 0..field_count {
                    line.push_str(",\"field");
                    line.push_str(&i.to_string());
                    line.push_str("\":\"");
                    push_random(rng, &mut line, LOG_FIELD_VALUE_LEN);
                    line.push('"');
                }
                line.push('}');
            }
        }

        line
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A named field and the generator for its value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub generator: ValueGenerator,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, generator: ValueGenerator) -> Self {
        Self { name: name.into(), generator }
    }
}

/// Ordered list of fields rendered into every record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Fields of a Prometheus pod log as shipped by Fluent Bit, with the
    /// dotted/slashed names used by flat JSON ingestion. Includes the `log`
    /// line as a logfmt string.
    pub fn kubernetes_flat() -> Self {
        Self::new(kubernetes_fields())
    }

    /// The same fields as [`Schema::kubernetes_flat`] with names rewritten
    /// into valid Loki label names and without the `log` line, which
    /// travels in the stream's `values` instead.
    pub fn kubernetes_labels() -> Self {
        Self::kubernetes_flat().into_labels()
    }

    /// Turn a schema into a Loki label set: names go through
    /// [`label_name`] and `log_line` fields are dropped.
    pub fn into_labels(self) -> Self {
        Self::new(
            self.fields
                .into_iter()
                .filter(|f| !matches!(f.generator, ValueGenerator::LogLine { .. }))
                .map(|f| FieldSpec::new(label_name(&f.name), f.generator))
                .collect(),
        )
    }

    /// Whether at least one field is derived from the iteration's unique id.
    pub fn has_unique_id(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f.generator, ValueGenerator::UniqueId { .. }))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Render one record. Fields are inserted in declaration order.
    pub fn render<R: Rng + ?Sized>(
        &self,
        ctx: &IterationContext,
        rng: &mut R,
        field_count: usize,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        let mut out = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = field.generator.generate(ctx, rng, field_count, now);
            out.insert(field.name.clone(), Value::String(value));
        }
        out
    }
}

/// Replace every character that is not valid in a Loki label name with `_`.
pub fn label_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn kubernetes_fields() -> Vec<FieldSpec> {
    use ValueGenerator as G;

    vec![
        FieldSpec::new("kubernetes.annotations.kubectl.kubernetes.io/default-container", G::constant("prometheus")),
        FieldSpec::new("kubernetes.annotations.kubernetes.io/psp", G::constant("eks.privileged")),
        FieldSpec::new("kubernetes.container_hash", G::random_string("quay.io/prometheus/prometheus@sha256:", 64)),
        FieldSpec::new("kubernetes.container_image", G::constant("quay.io/prometheus/prometheus:v2.39.1")),
        FieldSpec::new("kubernetes.container_name", G::constant("prometheus")),
        FieldSpec::new("kubernetes.docker_id", G::random_string("", 64)),
        FieldSpec::new("kubernetes.host", G::random_host("ip-10-2-50-", ".us-east-2.compute.internal")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/component", G::constant("prometheus")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/instance", G::unique_id("k8s-")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/managed-by", G::constant("prometheus-operator")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/name", G::constant("prometheus")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/part-of", G::constant("kube-prometheus")),
        FieldSpec::new("kubernetes.labels.app.kubernetes.io/version", G::constant("2.39.1")),
        FieldSpec::new("kubernetes.labels.controller-revision-hash", G::random_string("prometheus-k8s-", 10)),
        FieldSpec::new("kubernetes.labels.operator.prometheus.io/name", G::constant("k8s")),
        FieldSpec::new("kubernetes.labels.operator.prometheus.io/shard", G::constant("0")),
        FieldSpec::new("kubernetes.labels.prometheus", G::constant("k8s")),
        FieldSpec::new("kubernetes.labels.statefulset.kubernetes.io/pod-name", G::unique_id("prometheus-k8s-")),
        FieldSpec::new("kubernetes.namespace_name", G::constant("monitoring")),
        FieldSpec::new("kubernetes.pod_id", G::UuidLike),
        FieldSpec::new("kubernetes.pod_name", G::unique_id("prometheus-k8s-")),
        FieldSpec::new("log", G::log_line(LogLineFormat::Logfmt)),
        FieldSpec::new("stream", G::constant("stderr")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00.123Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn logfmt_line_has_timestamp_and_ordered_fields() {
        let mut rng = StdRng::seed_from_u64(9);
        let line = LogLineFormat::Logfmt.render(&mut rng, 24, now());

        let mut parts = line.split(' ');
        assert_eq!(parts.next(), Some("ts=2024-05-01T12:00:00.123Z"));

        let pairs: Vec<_> = parts.collect();
        assert_eq!(pairs.len(), 24);
        for (i, pair) in pairs.iter().enumerate() {
            let (key, value) = pair.split_once('=').unwrap();
            assert_eq!(key, format!("field{i}"));
            assert_eq!(value.len(), LOG_FIELD_VALUE_LEN);
            assert!(value.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn json_line_parses_with_ordered_keys() {
        let mut rng = StdRng::seed_from_u64(9);
        let line = LogLineFormat::Json.render(&mut rng, 24, now());

        let parsed: Map<String, Value> = serde_json::from_str(&line).unwrap();
        let keys: Vec<_> = parsed.keys().cloned().collect();
        let mut expected = vec!["ts".to_string()];
        expected.extend((0..24).map(|i| format!("field{i}")));
        assert_eq!(keys, expected);

        let ts = parsed["ts"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn field_count_is_configurable() {
        let mut rng = StdRng::seed_from_u64(1);
        let line = LogLineFormat::Logfmt.render(&mut rng, 3, now());
        assert_eq!(line.split(' ').count(), 4);
        assert!(line.contains(" field2="));
        assert!(!line.contains(" field3="));
    }

    #[test]
    fn flat_schema_embeds_unique_id() {
        let mut rng = StdRng::seed_from_u64(5);
        let ctx = IterationContext::new(3, 5, 2000);
        let record = Schema::kubernetes_flat().render(&ctx, &mut rng, 24, now());

        assert_eq!(record["kubernetes.pod_name"], "prometheus-k8s-4005");
        assert_eq!(record["kubernetes.labels.app.kubernetes.io/instance"], "k8s-4005");
        assert_eq!(record["kubernetes.namespace_name"], "monitoring");
        assert_eq!(record["stream"], "stderr");
        assert_eq!(record.len(), 23);

        let host = record["kubernetes.host"].as_str().unwrap();
        let octet = host
            .strip_prefix("ip-10-2-50-")
            .and_then(|h| h.strip_suffix(".us-east-2.compute.internal"))
            .unwrap();
        assert!(octet.parse::<u8>().is_ok());
    }

    #[test]
    fn label_schema_drops_log_and_sanitizes_names() {
        let labels = Schema::kubernetes_labels();
        assert_eq!(labels.len(), 22);
        assert!(labels.names().all(|n| n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')));
        assert!(labels.names().any(|n| n == "kubernetes_labels_statefulset_kubernetes_io_pod_name"));
        assert!(labels.names().any(|n| n == "kubernetes_annotations_kubectl_kubernetes_io_default_container"));
        assert!(!labels.names().any(|n| n == "log"));
    }

    #[test]
    fn schema_deserializes_from_yaml() {
        let yaml = r#"
fields:
  - name: service
    type: constant
    value: checkout
  - name: pod
    type: unique_id
    prefix: checkout-
  - name: trace
    type: random_string
    len: 16
  - name: id
    type: uuid_like
  - name: message
    type: log_line
    format: json
"#;
        let schema: Schema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.fields[0].generator, ValueGenerator::constant("checkout"));
        assert_eq!(schema.fields[1].generator, ValueGenerator::unique_id("checkout-"));
        assert_eq!(schema.fields[2].generator, ValueGenerator::random_string("", 16));
        assert_eq!(schema.fields[3].generator, ValueGenerator::UuidLike);
        assert_eq!(schema.fields[4].generator, ValueGenerator::log_line(LogLineFormat::Json));
    }

    #[test]
    fn into_labels_sanitizes_custom_schema() {
        let schema = Schema::new(vec![
            FieldSpec::new("kubernetes.pod_name", ValueGenerator::unique_id("pod-")),
            FieldSpec::new("log", ValueGenerator::log_line(LogLineFormat::Logfmt)),
            FieldSpec::new("app.kubernetes.io/name", ValueGenerator::constant("api")),
        ]);
        assert!(schema.has_unique_id());

        let labels = schema.into_labels();
        assert_eq!(
            labels.names().collect::<Vec<_>>(),
            vec!["kubernetes_pod_name", "app_kubernetes_io_name"]
        );
    }

    #[test]
    fn has_unique_id_requires_derived_field() {
        let schema = Schema::new(vec![
            FieldSpec::new("pod", ValueGenerator::constant("pod-1")),
            FieldSpec::new("id", ValueGenerator::UuidLike),
        ]);
        assert!(!schema.has_unique_id());
        assert!(Schema::kubernetes_flat().has_unique_id());
        assert!(Schema::kubernetes_labels().has_unique_id());
    }
}
