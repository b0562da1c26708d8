//! Tracing/logging initialization.
//!
//! JSON log lines on stdout, filtered via `RUST_LOG`. Without an explicit
//! filter the default level follows the deployment environment: `info` in
//! production, `debug` everywhere else.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let default_level = match std::env::var("APP_ENV").as_deref() {
        Ok("production") => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
