//! Environment variable names used to override the loaded configuration.
//!
//! These are purely helpers; the generator and sinks never read the
//! environment themselves.

/// Backend DSN, e.g. `victorialogs://42@localhost:9428`.
pub const LOADGEN_DSN_ENV: &str = "LOADGEN_DSN";

/// Tenant id, overriding the one embedded in the DSN.
pub const LOADGEN_TENANT_ID_ENV: &str = "LOADGEN_TENANT_ID";

/// Per-request timeout in milliseconds.
pub const LOADGEN_TIMEOUT_MS_ENV: &str = "LOADGEN_TIMEOUT_MS";

/// Records or streams per iteration.
pub const LOADGEN_BATCH_SIZE_ENV: &str = "LOADGEN_BATCH_SIZE";

/// Random `fieldN` pairs per log line.
pub const LOADGEN_FIELD_COUNT_ENV: &str = "LOADGEN_FIELD_COUNT";

/// Number of virtual users.
pub const LOADGEN_VUS_ENV: &str = "LOADGEN_VUS";

/// Iterations per virtual user.
pub const LOADGEN_ITERATIONS_ENV: &str = "LOADGEN_ITERATIONS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and empty alike.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
