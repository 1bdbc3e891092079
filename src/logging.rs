use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Console logging configuration.
///
/// **Fields**
/// - `level`: default filter directive, e.g. `info` or
///   `log_ingest_loadgen=debug`. `RUST_LOG` takes precedence when set.
/// - `ansi`: colorize output. Turn off when logs are captured to a file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), ansi: true }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global `tracing` subscriber.
///
/// **Effects**
///
/// Installs a [`Registry`] with an [`EnvFilter`] and a `fmt` layer writing
/// to stderr, so every event emitted by the runner and the sinks ends up on
/// the console. Calling this twice returns
/// [`LoggingError::AlreadyInitialized`] instead of panicking.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|source| LoggingError::Filter {
            directive: config.level.clone(),
            source,
        })?,
    };

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_ansi(config.ansi);
    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.ansi);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: LogConfig = serde_yaml::from_str("ansi: false").unwrap();
        assert_eq!(config.level, "info");
        assert!(!config.ansi);
    }
}
