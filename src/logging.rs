//! Logging setup for the adapter binaries.
//!
//! The subscriber writes to stderr only: stdout belongs to the result
//! document. Each binary wraps its run in a task-named span so every line
//! carries its adapter tag.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global stderr subscriber. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}
