use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::CeciConfig;

/// Initializes logging from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

/// Initializes logging with an explicit level or filter directive.
pub fn init_logging_with_level(level: &str) {
    install(EnvFilter::new(level));
}

/// Initializes logging from `RUST_LOG` when set, else the configured `log_level`.
pub fn init_logging_from(config: &CeciConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    install(filter);
}

// A subscriber may already be installed (tests call this repeatedly).
fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
