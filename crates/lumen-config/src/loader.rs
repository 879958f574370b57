//! Configuration loading: JSON documents layered with environment overrides.
//!
//! # Design
//! - Sources apply in order: defaults, optional JSON document, `LUMEN_*`
//!   environment variables. Validation runs once on the merged result.
//! - Environment access goes through [`EnvLookup`] so tests never mutate the
//!   process environment.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::LumenConfig;
use crate::validate::{parse_bool, parse_number};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "LUMEN_";

/// Source of environment-style key/value overrides.
pub trait EnvLookup {
    /// Return the raw value for `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads overrides from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl LumenConfig {
    /// Build configuration from defaults plus process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when an override does not parse or the merged
    /// configuration fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Build configuration from defaults plus overrides from `env`.
    ///
    /// # Errors
    ///
    /// See [`LumenConfig::from_env`].
    pub fn from_lookup(env: &impl EnvLookup) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode a JSON document, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::InvalidField`] when validation fails.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(document).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON document from disk, then layer `env` overrides on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the same errors as [`LumenConfig::from_json_str`].
    pub fn load_file(path: &Path, env: &impl EnvLookup) -> ConfigResult<Self> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&document).map_err(|source| ConfigError::Parse { source })?;
        config.apply_env(env)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Apply every recognised `LUMEN_*` override in place.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first override that
    /// does not parse.
    pub fn apply_env(&mut self, env: &impl EnvLookup) -> ConfigResult<()> {
        let lookup = |suffix: &str| env.var(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(raw) = lookup("API_URL") {
            self.api.base_url = Url::parse(raw.trim())
                .map_err(|_| ConfigError::invalid("api", "base_url", raw.clone(), "not_a_url"))?;
        }
        if let Some(raw) = lookup("USE_MOCK_DATA") {
            self.api.use_mock_data = parse_bool("api", "use_mock_data", &raw)?;
        }
        if let Some(raw) = lookup("STALE_TIME_SECS") {
            self.feeds.stale_time_secs = parse_number("feeds", "stale_time_secs", &raw)?;
        }
        if let Some(raw) = lookup("FETCH_RETRY") {
            self.feeds.retry = parse_number("feeds", "retry", &raw)?;
        }
        if let Some(raw) = lookup("FETCH_RETRY_DELAY_MS") {
            self.feeds.retry_delay_ms = parse_number("feeds", "retry_delay_ms", &raw)?;
        }
        if let Some(raw) = lookup("VIEW_THRESHOLD") {
            self.tracking.view_threshold = parse_number("tracking", "view_threshold", &raw)?;
        }
        if let Some(raw) = lookup("TRACK_ONCE") {
            self.tracking.track_once = parse_bool("tracking", "track_once", &raw)?;
        }
        if let Some(raw) = lookup("LOG_LEVEL") {
            self.logging.level = raw.trim().to_string();
        }
        if let Some(raw) = lookup("LOG_FORMAT") {
            self.logging.format = raw
                .parse()
                .unwrap_or_else(|never: std::convert::Infallible| match never {});
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_telemetry::LogFormat;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_yields_defaults() -> anyhow::Result<()> {
        let config = LumenConfig::from_lookup(&HashMap::new())?;
        assert_eq!(config, LumenConfig::default());
        Ok(())
    }

    #[test]
    fn overrides_apply_to_each_section() -> anyhow::Result<()> {
        let config = LumenConfig::from_lookup(&env(&[
            ("LUMEN_API_URL", "https://feeds.example.com/api/v1"),
            ("LUMEN_USE_MOCK_DATA", "true"),
            ("LUMEN_STALE_TIME_SECS", "5"),
            ("LUMEN_FETCH_RETRY", "3"),
            ("LUMEN_FETCH_RETRY_DELAY_MS", "0"),
            ("LUMEN_VIEW_THRESHOLD", "0.75"),
            ("LUMEN_TRACK_ONCE", "false"),
            ("LUMEN_LOG_LEVEL", "debug"),
            ("LUMEN_LOG_FORMAT", "json"),
        ]))?;
        assert_eq!(config.api.base_url.host_str(), Some("feeds.example.com"));
        assert!(config.api.use_mock_data);
        assert_eq!(config.feeds.stale_time_secs, 5);
        assert_eq!(config.feeds.retry, 3);
        assert_eq!(config.feeds.retry_delay_ms, 0);
        assert!((config.tracking.view_threshold - 0.75).abs() < f64::EPSILON);
        assert!(!config.tracking.track_once);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        Ok(())
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let result = LumenConfig::from_lookup(&env(&[("LUMEN_VIEW_THRESHOLD", "1.5")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidField {
                field: "view_threshold",
                reason: "out_of_range",
                ..
            })
        ));
    }

    #[test]
    fn malformed_url_is_reported() {
        let result = LumenConfig::from_lookup(&env(&[("LUMEN_API_URL", "not a url")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidField {
                field: "base_url",
                reason: "not_a_url",
                ..
            })
        ));
    }

    #[test]
    fn json_documents_merge_with_defaults() -> anyhow::Result<()> {
        let config = LumenConfig::from_json_str(r#"{"feeds": {"news_page_size": 4}}"#)?;
        assert_eq!(config.feeds.news_page_size, 4);
        assert_eq!(config.feeds.for_you_page_size, 20);
        assert!(matches!(
            LumenConfig::from_json_str("{"),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = LumenConfig::load_file(Path::new("/nonexistent/lumen.json"), &HashMap::new());
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
