//! Process-level setup shared by binaries and long-running embeddings.

use std::sync::OnceLock;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global tracing subscriber exactly once.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_directive`
/// applies. Safe to call from multiple entry points, later calls are
/// no-ops.
pub fn init_tracing(default_directive: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_directive))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
