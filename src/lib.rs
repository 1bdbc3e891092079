pub mod random;
pub mod record;
pub mod schema;
pub mod generator;
pub mod sink;
pub mod backend;

#[cfg(feature = "openobserve")]
pub mod openobserve;

#[cfg(feature = "loki")]
pub mod loki;

pub mod noop_sink;
pub mod runner;
pub mod config;
pub mod env;
pub mod logging;
