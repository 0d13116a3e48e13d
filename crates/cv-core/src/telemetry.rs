//! Tracing subscriber setup

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ConfigError, LogConfig, LogFormat};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Returns `Ok(false)` when a
/// subscriber was already installed (e.g. a second call in tests).
pub fn init_tracing(config: &LogConfig) -> Result<bool, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(config)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    let installed = result.is_ok();
    if installed {
        info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    }
    Ok(installed)
}

/// Filter from the configured directive, ignoring `RUST_LOG`
fn build_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(&config.filter).map_err(|e| {
        ConfigError::Logging(format!("invalid filter {:?}: {}", config.filter, e))
    })
}
