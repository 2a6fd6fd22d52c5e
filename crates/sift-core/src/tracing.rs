//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; binaries and tests call
//! [`init_tracing`] once to see them. The `SIFT_LOG` environment variable
//! takes an `EnvFilter` directive and overrides the default level.

use tracing_subscriber::EnvFilter;

/// Environment variable read for the log filter.
pub const LOG_ENV_VAR: &str = "SIFT_LOG";

/// Install a fmt subscriber at `info` unless `SIFT_LOG` says otherwise.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Install a fmt subscriber with the given default directive.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
