//! Logging Setup
//!
//! Tracing subscriber initialization for binaries and tests embedding
//! the engine. Library code only emits `tracing` events; installing a
//! subscriber is the host's choice.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Filter defaults to `info`
/// and is overridable via `RUST_LOG`. Safe to call more than once; only
/// the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
