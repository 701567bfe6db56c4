//! Tracing bootstrap for hosts, demos, and tests.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the host's choice. These helpers wire up the usual env-filtered fmt
//! subscriber and are safe to call more than once.

use tracing_subscriber::EnvFilter;

/// Initializes an env-filtered fmt subscriber with an `info` default.
///
/// Respects `RUST_LOG` when set.
pub fn init() {
    init_with_default("info");
}

/// Initializes the subscriber with the given default directive when
/// `RUST_LOG` is unset.
pub fn init_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
