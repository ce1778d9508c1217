//! Tracing subscriber setup for processes embedding the registry.

use tracing_subscriber::{fmt, EnvFilter};

use dnmetrics_core::error::{MetricsError, Result};

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Returns an error instead of panicking when a global subscriber is already
/// set.
pub fn init_tracing() -> Result<()> {
    install(EnvFilter::from_default_env())
}

/// Install a fmt subscriber with an explicit filter directive such as
/// `"dnmetrics_registry=debug"`.
pub fn init_tracing_with(directives: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directives)
        .map_err(|e| MetricsError::BadConfig(format!("invalid log filter {directives:?}: {e}")))?;
    install(filter)
}

fn install(filter: EnvFilter) -> Result<()> {
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| MetricsError::Internal(format!("tracing init failed: {e}")))
}
