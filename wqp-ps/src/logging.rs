//! Tracing subscriber setup shared by the service and the CLI

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes priority; otherwise `default_level` (from config) applies.
/// Output goes to stderr so the CLI can keep stdout for results.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
