use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Deserialize;

use crate::backend::{parse_dsn, BackendConfig, BackendKind, ClientConfig, DsnError, VictoriaTenant};
use crate::env;
use crate::generator::{BatchGenerator, GeneratorConfig, ParameterizedGenerator, PayloadGenerator};
use crate::logging::LogConfig;
use crate::record::WireShape;
use crate::runner::Scenario;
use crate::schema::Schema;

/// Complete configuration of a load run, usually read from YAML.
///
/// Every section is optional; missing values fall back to the defaults of
/// the VictoriaLogs scenario (50 VUs x 2000 iterations of 1000 records).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend DSN, see [`parse_dsn`].
    pub dsn: String,
    /// Tenant id. Overrides the tenant embedded in the DSN.
    pub tenant_id: Option<String>,
    /// Per-request deadline.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub scenario: Scenario,
    pub generator: GeneratorConfig,
    pub payload: PayloadConfig,
    /// Replaces the built-in kubernetes schema when set.
    pub schema: Option<Schema>,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: "victorialogs://localhost:9428".to_string(),
            tenant_id: None,
            timeout: Duration::from_secs(10),
            user_agent: None,
            scenario: Scenario::default(),
            generator: GeneratorConfig::default(),
            payload: PayloadConfig::default(),
            schema: None,
            log: LogConfig::default(),
        }
    }
}

/// Which payload every iteration pushes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadConfig {
    /// `batch_size` kubernetes records in the backend's wire shape.
    #[default]
    Kubernetes,
    /// A fixed number of Loki streams filled up to a random byte size.
    Parameterized {
        #[serde(default = "default_streams")]
        streams: usize,
        #[serde(default = "default_min_bytes")]
        min_bytes: ByteSize,
        #[serde(default = "default_max_bytes")]
        max_bytes: ByteSize,
    },
}

fn default_streams() -> usize {
    10
}

fn default_min_bytes() -> ByteSize {
    ByteSize::kib(800)
}

fn default_max_bytes() -> ByteSize {
    ByteSize::mib(2)
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid DSN: {0}")]
    Dsn(#[from] DsnError),

    #[error("invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Apply the `LOADGEN_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(env::env_var)
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dsn) = lookup(env::LOADGEN_DSN_ENV) {
            self.dsn = dsn;
        }
        if let Some(tenant) = lookup(env::LOADGEN_TENANT_ID_ENV) {
            self.tenant_id = Some(tenant);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, env::LOADGEN_TIMEOUT_MS_ENV)? {
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(batch_size) = parse_var(&lookup, env::LOADGEN_BATCH_SIZE_ENV)? {
            self.generator.batch_size = batch_size;
        }
        if let Some(field_count) = parse_var(&lookup, env::LOADGEN_FIELD_COUNT_ENV)? {
            self.generator.field_count = field_count;
        }
        if let Some(vus) = parse_var(&lookup, env::LOADGEN_VUS_ENV)? {
            self.scenario.vus = vus;
        }
        if let Some(iterations) = parse_var(&lookup, env::LOADGEN_ITERATIONS_ENV)? {
            self.scenario.iterations = iterations;
        }
        Ok(())
    }

    /// Parse the DSN and apply the tenant override.
    pub fn backend(&self) -> Result<BackendConfig, ConfigError> {
        let mut backend = parse_dsn(&self.dsn)?;
        if let Some(tenant) = self.tenant_id.as_ref().filter(|t| !t.is_empty()) {
            backend.tenant_id = Some(tenant.clone());
        }
        Ok(backend)
    }

    pub fn client(&self) -> ClientConfig {
        let mut client = ClientConfig { timeout: self.timeout, ..ClientConfig::default() };
        if let Some(user_agent) = &self.user_agent {
            client.user_agent = user_agent.clone();
        }
        client
    }

    /// Generator producing batches in `shape`.
    pub fn payload_generator(&self, shape: WireShape) -> PayloadGenerator {
        match &self.payload {
            PayloadConfig::Kubernetes => {
                let mut generator = BatchGenerator::for_shape(shape, &self.generator);
                if let Some(schema) = &self.schema {
                    generator = generator.with_schema(schema.clone());
                }
                PayloadGenerator::Kubernetes(generator)
            }
            PayloadConfig::Parameterized { streams, min_bytes, max_bytes } => {
                PayloadGenerator::Parameterized(ParameterizedGenerator {
                    streams: *streams,
                    min_bytes: min_bytes.as_u64(),
                    max_bytes: max_bytes.as_u64(),
                    field_count: self.generator.field_count,
                })
            }
        }
    }

    /// Check the configuration and return the resolved backend.
    pub fn validate(&self) -> Result<BackendConfig, ConfigError> {
        let backend = self.backend()?;

        if self.scenario.vus == 0 {
            return Err(ConfigError::Invalid("scenario.vus must be at least 1".into()));
        }
        if self.scenario.iterations == 0 {
            return Err(ConfigError::Invalid("scenario.iterations must be at least 1".into()));
        }
        // Unique ids run from 0 to vus * iterations - 1.
        if self.scenario.vus.checked_mul(self.scenario.iterations).is_none() {
            return Err(ConfigError::Invalid(format!(
                "scenario.vus * scenario.iterations overflows the unique id range ({} * {})",
                self.scenario.vus, self.scenario.iterations
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".into()));
        }

        match &self.payload {
            PayloadConfig::Kubernetes => {
                if self.generator.batch_size == 0 {
                    return Err(ConfigError::Invalid("generator.batch_size must be at least 1".into()));
                }
                if let Some(schema) = &self.schema {
                    if schema.is_empty() {
                        return Err(ConfigError::Invalid("schema must declare at least one field".into()));
                    }
                    if !schema.has_unique_id() {
                        return Err(ConfigError::Invalid(
                            "schema must declare a unique_id field so batches stay distinguishable".into(),
                        ));
                    }
                }
            }
            PayloadConfig::Parameterized { streams, min_bytes, max_bytes } => {
                if backend.wire_shape() != WireShape::Streams {
                    return Err(ConfigError::Invalid(format!(
                        "parameterized payloads need a Loki-shaped backend, {} takes {}",
                        backend.kind,
                        backend.wire_shape()
                    )));
                }
                if *streams == 0 {
                    return Err(ConfigError::Invalid("payload.streams must be at least 1".into()));
                }
                if min_bytes > max_bytes {
                    return Err(ConfigError::Invalid(format!(
                        "payload.min_bytes ({min_bytes}) exceeds payload.max_bytes ({max_bytes})"
                    )));
                }
            }
        }

        if backend.kind == BackendKind::VictoriaLogs {
            if let Some(tenant) = &backend.tenant_id {
                VictoriaTenant::parse(tenant).map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
        }

        Ok(backend)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::Env { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.scenario.vus, 50);
        assert_eq!(config.scenario.iterations, 2000);
        assert_eq!(config.generator.batch_size, 1000);
        assert_eq!(config.generator.field_count, 24);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.payload, PayloadConfig::Kubernetes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_yaml() {
        let config = Config::from_yaml(
            r#"
dsn: "loki://localhost:3100"
tenant_id: "42"
timeout: 5s
scenario:
  vus: 1
  iterations: 1
  think_time: 1s
payload:
  type: parameterized
  streams: 10
  min_bytes: 800 KiB
  max_bytes: 2 MiB
log:
  level: debug
"#,
        )
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.scenario.think_time, Duration::from_secs(1));
        assert_eq!(config.log.level, "debug");

        let backend = config.validate().unwrap();
        assert_eq!(backend.tenant_id.as_deref(), Some("42"));

        match config.payload_generator(backend.wire_shape()) {
            PayloadGenerator::Parameterized(generator) => {
                assert_eq!(generator.streams, 10);
                assert_eq!(generator.min_bytes, 800 * 1024);
                assert_eq!(generator.max_bytes, 2 * 1024 * 1024);
            }
            other => panic!("unexpected generator {other:?}"),
        }
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LOADGEN_DSN", "openobserve://localhost:5080/default/logs"),
            ("LOADGEN_VUS", "3"),
            ("LOADGEN_ITERATIONS", "7"),
            ("LOADGEN_TIMEOUT_MS", "250"),
            ("LOADGEN_BATCH_SIZE", "10"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.dsn, "openobserve://localhost:5080/default/logs");
        assert_eq!(config.scenario.vus, 3);
        assert_eq!(config.scenario.iterations, 7);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.generator.batch_size, 10);
        assert_eq!(config.generator.field_count, 24);
    }

    #[test]
    fn malformed_env_value_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|key| (key == "LOADGEN_VUS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "LOADGEN_VUS", .. }));
    }

    #[test]
    fn tenant_override_replaces_dsn_tenant() {
        let config = Config {
            dsn: "victorialogs://1@localhost:9428".into(),
            tenant_id: Some("42:7".into()),
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap().tenant_id.as_deref(), Some("42:7"));
    }

    #[test]
    fn rejects_invalid_configurations() {
        let zero_vus = Config {
            scenario: Scenario { vus: 0, ..Scenario::default() },
            ..Config::default()
        };
        assert!(matches!(zero_vus.validate(), Err(ConfigError::Invalid(_))));

        let flat_parameterized = Config {
            dsn: "openobserve://localhost:5080".into(),
            payload: PayloadConfig::Parameterized {
                streams: 10,
                min_bytes: default_min_bytes(),
                max_bytes: default_max_bytes(),
            },
            ..Config::default()
        };
        assert!(matches!(flat_parameterized.validate(), Err(ConfigError::Invalid(_))));

        let inverted = Config {
            payload: PayloadConfig::Parameterized {
                streams: 1,
                min_bytes: ByteSize::mib(4),
                max_bytes: ByteSize::mib(1),
            },
            ..Config::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::Invalid(_))));

        let bad_tenant = Config {
            tenant_id: Some("acme".into()),
            ..Config::default()
        };
        assert!(matches!(bad_tenant.validate(), Err(ConfigError::Invalid(_))));

        let bad_dsn = Config { dsn: "kafka://broker".into(), ..Config::default() };
        assert!(matches!(bad_dsn.validate(), Err(ConfigError::Dsn(_))));
    }

    #[test]
    fn rejects_unique_id_overflow() {
        let huge = Config {
            scenario: Scenario { vus: u64::MAX, iterations: 2, ..Scenario::default() },
            ..Config::default()
        };
        assert!(matches!(huge.validate(), Err(ConfigError::Invalid(_))));

        let largest = Config {
            scenario: Scenario { vus: u64::MAX, iterations: 1, ..Scenario::default() },
            ..Config::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn rejects_schema_without_unique_id() {
        let config = Config::from_yaml(
            r#"
dsn: "loki://localhost:3100"
schema:
  fields:
    - name: kubernetes.pod_name
      type: constant
      value: prometheus-k8s-0
    - name: log
      type: log_line
      format: json
"#,
        )
        .unwrap();

        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("unique_id"), "{msg}"),
            other => panic!("expected an invalid schema, got {other:?}"),
        }
    }

    #[test]
    fn custom_schema_becomes_loki_labels() {
        let config = Config::from_yaml(
            r#"
dsn: "loki://localhost:3100"
schema:
  fields:
    - name: kubernetes.pod_name
      type: unique_id
      prefix: "pod-"
    - name: log
      type: log_line
      format: json
"#,
        )
        .unwrap();
        config.validate().unwrap();

        match config.payload_generator(WireShape::Streams) {
            PayloadGenerator::Kubernetes(generator) => {
                assert_eq!(generator.schema().names().collect::<Vec<_>>(), vec!["kubernetes_pod_name"]);
            }
            other => panic!("unexpected generator {other:?}"),
        }
    }

    #[test]
    fn custom_schema_replaces_builtin() {
        let config = Config::from_yaml(
            r#"
dsn: "openobserve://localhost:5080"
schema:
  fields:
    - name: service
      type: constant
      value: checkout
    - name: request.id
      type: unique_id
      prefix: "req-"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        match config.payload_generator(WireShape::Flat) {
            PayloadGenerator::Kubernetes(generator) => {
                assert_eq!(generator.schema().names().collect::<Vec<_>>(), vec!["service", "request.id"]);
            }
            other => panic!("unexpected generator {other:?}"),
        }
    }
}
