use std::path::PathBuf;

use log_ingest_loadgen::backend::BackendKind;
use log_ingest_loadgen::config::{Config, PayloadConfig};
use log_ingest_loadgen::generator::PayloadGenerator;
use log_ingest_loadgen::record::WireShape;

fn load(name: &str) -> Config {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name);
    Config::load(&path).unwrap()
}

#[test]
fn openobserve_sample_is_valid() {
    let config = load("openobserve.yaml");
    let backend = config.validate().unwrap();

    assert_eq!(backend.kind, BackendKind::OpenObserve);
    assert_eq!(backend.expected_status(), 200);
    assert_eq!(backend.push_url(), "http://localhost:5080/api/default/quickstart1/_json");
    assert_eq!(config.scenario.vus, 50);
    assert_eq!(config.payload_generator(backend.wire_shape()).shape(), WireShape::Flat);
}

#[test]
fn victorialogs_sample_is_valid() {
    let config = load("victorialogs.yaml");
    let backend = config.validate().unwrap();

    assert_eq!(backend.kind, BackendKind::VictoriaLogs);
    assert_eq!(backend.expected_status(), 204);
    assert_eq!(config.scenario.vus, 250);
    assert_eq!(config.scenario.iterations, 2000);
    assert_eq!(config.payload, PayloadConfig::Kubernetes);
}

#[test]
fn parameterized_sample_is_valid() {
    let config = load("loki-parameterized.yaml");
    let backend = config.validate().unwrap();

    assert_eq!(backend.tenant_id.as_deref(), Some("42"));
    assert!(matches!(
        config.payload_generator(backend.wire_shape()),
        PayloadGenerator::Parameterized(_)
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Config::load(&PathBuf::from("/nonexistent/loadgen.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/loadgen.yaml"));
}
