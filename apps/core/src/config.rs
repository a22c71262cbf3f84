//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Variables already set in the environment take precedence over the
//! file, and empty values count as unset.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;
use validator::Validate;

use crate::brain::classifier::TrainingConfig;
use crate::error::AppError;

pub const ENV_LOG_LEVEL: &str = "GUTCHAT_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "GUTCHAT_LOG_FORMAT";
pub const ENV_LEARNING_MAX: &str = "GUTCHAT_LEARNING_MAX";
pub const ENV_CLASSIFIER_ITERS: &str = "GUTCHAT_CLASSIFIER_ITERS";
pub const ENV_AUGMENT_URL: &str = "GUTCHAT_AUGMENT_URL";
pub const ENV_AUGMENT_MODEL: &str = "GUTCHAT_AUGMENT_MODEL";
pub const ENV_AUGMENT_TEMPERATURE: &str = "GUTCHAT_AUGMENT_TEMPERATURE";
pub const ENV_AUGMENT_API_KEY: &str = "GUTCHAT_AUGMENT_API_KEY";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_AUGMENT_MODEL: &str = "gpt-4o";
const DEFAULT_AUGMENT_TEMPERATURE: f32 = 0.7;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// Bunyan-style JSON records
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" | "bunyan" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("unknown log format: {}", other))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Settings of the optional reply augmentation service.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AugmentConfig {
    /// Base URL of an OpenAI-compatible API; augmentation is off when unset.
    #[validate(url)]
    pub base_url: Option<String>,
    #[validate(length(min = 1))]
    pub model: String,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    pub api_key: Option<String>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: DEFAULT_AUGMENT_MODEL.to_string(),
            temperature: DEFAULT_AUGMENT_TEMPERATURE,
            api_key: None,
        }
    }
}

impl AugmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }
}

/// Configuration of the core and its reference host.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct CoreConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[validate(length(min = 1))]
    pub log_level: String,
    pub log_format: LogFormat,
    /// Bound on learned overrides; unbounded when `None`
    pub learning_max: Option<NonZeroUsize>,
    #[validate(range(min = 1, max = 10000))]
    pub classifier_iterations: usize,
    #[validate(nested)]
    pub augment: AugmentConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
            learning_max: None,
            classifier_iterations: TrainingConfig::default().iterations,
            augment: AugmentConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Loads `.env` from the working directory when present, then reads the
    /// environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment file {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the environment, falling back to the entries of `path` for
    /// variables the environment does not set. The process environment is
    /// left untouched.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let iter = dotenv::from_path_iter(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut file_vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                AppError::Config(format!("malformed line in {}: {}", path.display(), e))
            })?;
            file_vars.insert(key, value);
        }

        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        })
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            log_level: get(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: parse_var(&get, ENV_LOG_FORMAT)?.unwrap_or(defaults.log_format),
            learning_max: parse_var(&get, ENV_LEARNING_MAX)?,
            classifier_iterations: parse_var(&get, ENV_CLASSIFIER_ITERS)?
                .unwrap_or(defaults.classifier_iterations),
            augment: AugmentConfig {
                base_url: get(ENV_AUGMENT_URL),
                model: get(ENV_AUGMENT_MODEL).unwrap_or(defaults.augment.model),
                temperature: parse_var(&get, ENV_AUGMENT_TEMPERATURE)?
                    .unwrap_or(defaults.augment.temperature),
                api_key: get(ENV_AUGMENT_API_KEY),
            },
        };

        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            iterations: self.classifier_iterations,
            ..TrainingConfig::default()
        }
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?} is invalid: {}", name, raw, e))),
    }
}
