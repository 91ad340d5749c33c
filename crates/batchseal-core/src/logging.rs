//! Subscriber setup for applications embedding the engine.
//!
//! The library crates only emit `tracing` events; whoever owns the process
//! decides where they go. `try_init` is used so repeated calls (test
//! binaries, embedding hosts that already installed a subscriber) are no-ops.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Install a global subscriber honouring `RUST_LOG`, falling back to
/// `config.level`. Returns false if a subscriber was already installed.
pub fn init(config: &LogConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    result.is_ok()
}

/// Subscriber for test binaries: output goes through the libtest capture.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}
