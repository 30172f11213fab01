//! §10.3 Logging & tracing: an `EnvFilter` built from `RUST_LOG`/the
//! configured log level, falling back to `info`. No OpenTelemetry layer —
//! deployment wiring (and anything downstream of logs) is out of scope.

use tracing_subscriber::EnvFilter;

pub fn build_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

pub fn init(configured_level: &str) {
    tracing_subscriber::fmt().with_env_filter(build_filter(configured_level)).init();
}
