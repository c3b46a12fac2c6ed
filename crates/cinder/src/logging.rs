//! Tracing subscriber setup for binaries built on Cinder.

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` (for example `"cinder=info"`) when
/// `RUST_LOG` is unset or invalid. Calling it twice is harmless: the second
/// call leaves the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
