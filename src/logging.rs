// 📜 Logging - tracing subscriber setup for the binaries
//
// The library only emits events; binaries call `init` once.

use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber. RUST_LOG wins over the configured filter.
/// Returns false when a subscriber was already installed.
pub fn init(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
