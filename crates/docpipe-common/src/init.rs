//! Global initialization for binaries and tests

use std::sync::Once;

static INIT: Once = Once::new();
static TRACING: Once = Once::new();

/// Load environment configuration once per process
///
/// Loads a `.env` file if one exists in or above the working directory.
/// Safe to call multiple times.
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Install the global tracing subscriber
///
/// Filter comes from `RUST_LOG` (default `info`). Safe to call multiple
/// times; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .ok();
    });
}
