//! Tracing subscriber bootstrap.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber once.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// `RUST_LOG` wins over `level`. Calling this again after a subscriber is
/// installed is a no-op, so tests and embedding callers can call it freely.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!("Tracing initialized (json={})", json);
    }
}

