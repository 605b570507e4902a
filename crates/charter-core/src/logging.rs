//! Tracing setup
//!
//! Library code only emits `tracing` events. Path-safety rejections are
//! logged at warn under the [`SECURITY_TARGET`] target so they can be routed
//! separately.

use tracing_subscriber::EnvFilter;

/// Target of security events
pub const SECURITY_TARGET: &str = "charter::security";

/// Install a stderr fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
