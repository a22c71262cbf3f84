//! Tracing subscriber setup.
//!
//! Logs always go to stderr so a host speaking on stdout keeps a clean
//! channel. `RUST_LOG` overrides the configured level.

use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;
use crate::error::AppError;

const SERVICE_NAME: &str = "gutchat";

/// Builds the level filter: `RUST_LOG` when set and valid, else `level`.
pub fn env_filter(level: &str) -> Result<EnvFilter, AppError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Config(format!("invalid log level {:?}: {}", level, e)))
}

/// Builds the subscriber for `format` without installing it.
pub fn subscriber(
    level: &str,
    format: LogFormat,
) -> Result<impl Subscriber + Send + Sync + 'static, AppError> {
    let filter = env_filter(level)?;
    let json = format == LogFormat::Json;

    let pretty_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let storage_layer = json.then_some(JsonStorageLayer);
    let bunyan_layer =
        json.then(|| BunyanFormattingLayer::new(SERVICE_NAME.to_string(), std::io::stderr));

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(pretty_layer)
        .with(storage_layer)
        .with(bunyan_layer))
}

/// Installs the global subscriber.
///
/// Fails with [`AppError::Internal`] when a subscriber is already installed.
pub fn init(level: &str, format: LogFormat) -> Result<(), AppError> {
    subscriber(level, format)?
        .try_init()
        .map_err(|e| AppError::Internal(format!("tracing already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_invalid_level_is_config_error() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert!(matches!(env_filter("[[["), Err(AppError::Config(_))));
            assert!(env_filter("gutchat_core=debug,info").is_ok());
        });
    }

    #[test]
    fn test_subscriber_applies_configured_level() {
        temp_env::with_var_unset("RUST_LOG", || {
            for format in [LogFormat::Pretty, LogFormat::Json] {
                let subscriber = subscriber("warn", format).unwrap();
                tracing::subscriber::with_default(subscriber, || {
                    assert!(tracing::enabled!(Level::ERROR));
                    assert!(tracing::enabled!(Level::WARN));
                    assert!(!tracing::enabled!(Level::INFO));
                });
            }
        });
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        temp_env::with_var("RUST_LOG", Some("debug"), || {
            let subscriber = subscriber("error", LogFormat::Pretty).unwrap();
            tracing::subscriber::with_default(subscriber, || {
                assert!(tracing::enabled!(Level::DEBUG));
                assert!(!tracing::enabled!(Level::TRACE));
            });
        });
    }

    #[test]
    fn test_subscriber_rejects_invalid_level() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert!(matches!(
                subscriber("[[[", LogFormat::Json),
                Err(AppError::Config(_))
            ));
        });
    }
}
