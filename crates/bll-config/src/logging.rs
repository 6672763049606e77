//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{error::ConfigError, types::LoggingSettings, Result};

/// Install the global fmt subscriber
///
/// `RUST_LOG` overrides the configured level. Returns `Ok(false)` when a
/// global subscriber was already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| ConfigError::LogFilter(e.to_string()))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(settings.with_target)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %settings.level, "Logging initialised");
    }
    Ok(installed)
}
