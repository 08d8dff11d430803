//! Log subscriber setup for native harnesses.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the embedding test binary. This helper wires the usual one.

use crate::config::StubConfig;
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `config.log_filter`. Returns `false` if a
/// subscriber was already installed, which is expected when several tests
/// call this.
pub fn init_logging(config: &StubConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init()
            .is_ok()
    }
}
