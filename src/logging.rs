//! Tracing subscriber setup for embedders.
//!
//! The core only emits `tracing` events; installing a subscriber is the
//! entry point's job. This helper applies the conventional setup:
//! `RUST_LOG`-style filtering with an `info` default, optionally JSON
//! formatted for log shippers.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // Already-initialized is the only expected failure; tests and
    // embedders may both race to install.
    let _ = result;
}
