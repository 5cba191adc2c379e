//! Tracing setup for processes embedding the feed engine

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used as the filter.
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(log_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok()
}
