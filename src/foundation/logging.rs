use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target used for contract violations that a crash/telemetry sink should pick up.
pub const TELEMETRY_TARGET: &str = "telemetry";

/// Installs a stderr `fmt` subscriber. `RUST_LOG` wins over `default_level` when set.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
}

/// Logs a backend/schema contract violation. These are not recoverable at runtime; the
/// offending item is skipped by the caller.
pub fn report_contract_violation(msg: &str) {
    tracing::error!(target: TELEMETRY_TARGET, "contract violation: {msg}");
}

pub fn report_previous_crash() {
    tracing::error!(target: TELEMETRY_TARGET, "crash detected in previous session");
}
