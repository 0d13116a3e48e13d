//! Configuration types and loading
//!
//! Defaults are usable as-is; environment variables override them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default number of photos allowed on a single record
pub const DEFAULT_ATTACHMENT_CAPACITY: usize = 3;

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info,cv_attachments=debug";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Photo attachment limits
    pub attachments: AttachmentSettings,

    /// Logging configuration
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AttachmentSettings {
    /// Maximum photos (already uploaded + pending) per record
    pub capacity: usize,
    /// Image MIME types that are refused even though they are images
    pub blocked_mime_types: Vec<String>,
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ATTACHMENT_CAPACITY,
            blocked_mime_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info,cv_attachments=debug`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Cannot read env file {path}: {message}")]
    EnvFile { path: String, message: String },
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl AppConfig {
    /// Load `.env` (if present) and then read the environment
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => warn!(error = %e, "Failed to read .env file, using environment only"),
        }
        Self::from_env()
    }

    /// Load a specific env file, then read the environment.
    ///
    /// Variables already set in the environment are not overridden.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "Loaded env file");
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Attachments
        if let Some(raw) = lookup("CONVOY_ATTACHMENT_CAPACITY") {
            let capacity: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONVOY_ATTACHMENT_CAPACITY".to_string(),
                message: format!("expected a positive integer, got {:?}", raw),
            })?;
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "CONVOY_ATTACHMENT_CAPACITY".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.attachments.capacity = capacity;
        }
        if let Some(raw) = lookup("CONVOY_BLOCKED_IMAGE_TYPES") {
            config.attachments.blocked_mime_types = raw
                .split(',')
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }

        // Logging
        if let Some(filter) = lookup("CONVOY_LOG") {
            config.logging.filter = filter;
        }
        if let Some(raw) = lookup("CONVOY_LOG_FORMAT") {
            config.logging.format =
                LogFormat::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                    key: "CONVOY_LOG_FORMAT".to_string(),
                    message: format!("expected `pretty` or `json`, got {:?}", raw),
                })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.attachments.capacity, 3);
        assert!(config.attachments.blocked_mime_types.is_empty());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CONVOY_ATTACHMENT_CAPACITY", "5"),
            ("CONVOY_BLOCKED_IMAGE_TYPES", "image/svg+xml, IMAGE/TIFF,,"),
            ("CONVOY_LOG", "warn"),
            ("CONVOY_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.attachments.capacity, 5);
        assert_eq!(
            config.attachments.blocked_mime_types,
            vec!["image/svg+xml".to_string(), "image/tiff".to_string()]
        );
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("CONVOY_ATTACHMENT_CAPACITY", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_rejects_non_numeric_capacity() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("CONVOY_ATTACHMENT_CAPACITY", "three")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == "CONVOY_ATTACHMENT_CAPACITY"
        ));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let result = AppConfig::from_lookup(lookup_from(&[("CONVOY_LOG_FORMAT", "xml")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(json["attachments"]["capacity"], 3);
        assert_eq!(json["logging"]["format"], "pretty");
    }

    #[test]
    fn test_load_from_env_file() {
        let path = std::env::temp_dir()
            .join(format!("convoy-config-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "CONVOY_ATTACHMENT_CAPACITY=4\nCONVOY_BLOCKED_IMAGE_TYPES=image/gif\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.attachments.capacity, 4);
        assert_eq!(config.attachments.blocked_mime_types, vec!["image/gif".to_string()]);
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("convoy-config-does-not-exist.env");
        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }
}
