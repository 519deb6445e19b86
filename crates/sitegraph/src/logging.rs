//! Logger setup for applications embedding the engine.
//!
//! The library crates only emit through the `log` facade. These helpers
//! install an `env_logger` backend; `RUST_LOG` takes precedence over the
//! filter passed in.

use env_logger::{Builder, Env};
use sitegraph_core::prelude::*;

/// Install the global logger with `filter` as the default directive
/// (e.g. `"info"` or `"sitegraph_graph=debug"`).
///
/// Fails if a logger is already installed.
pub fn try_init(filter: &str) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| Error::other(format!("Failed to initialize logger: {}", e)))?;
    log::debug!("Logger initialized (default filter: {})", filter);
    Ok(())
}

/// Like [`try_init`], but a logger that is already installed is left in place
pub fn init(filter: &str) {
    if let Err(e) = try_init(filter) {
        log::debug!("{}", e);
    }
}
