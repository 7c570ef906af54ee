//! Diagnostic output for the sink itself
//!
//! Warnings about failed flushes, rotations or deletions go to stderr through
//! `tracing`, never into the log file being managed.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "logsink=warn";

/// Install a stderr subscriber filtered by `RUST_LOG`
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_diagnostics() {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_diagnostics_twice_does_not_panic() {
        init_diagnostics();
        init_diagnostics();
        tracing::warn!("diagnostics initialised");
    }
}
