//! Logging setup for programs embedding graph-poster.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application. `RUST_LOG` wins over the level passed in.

use tracing_subscriber::EnvFilter;

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install a global fmt subscriber filtered at `level`.
///
/// Returns an error instead of panicking when a subscriber is already set.
pub fn init(level: &str) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
