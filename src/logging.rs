//! Log subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the process that embeds it.

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects `gossamer=debug`
/// and the default is `gossamer=info`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let fallback = if verbose { "gossamer=debug" } else { "gossamer=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
