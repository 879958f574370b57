//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; every section deserializes with defaults so partial
//!   documents layer cleanly over the baseline.
//! - IO and environment handling live in `loader.rs`.

use std::time::Duration;

use lumen_telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::ConfigResult;
use crate::validate;

/// Fully resolved client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LumenConfig {
    /// Feed API location and data mode.
    pub api: ApiConfig,
    /// Pagination and caching knobs.
    pub feeds: FeedTuning,
    /// View tracking behaviour.
    pub tracking: TrackingConfig,
    /// Playback defaults.
    pub playback: PlaybackConfig,
    /// Logging output.
    pub logging: LoggingSettings,
}

impl LumenConfig {
    /// Validate every section, returning the first violation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] naming the offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::api_url(&self.api.base_url)?;
        validate::positive_u32("feeds", "for_you_page_size", self.feeds.for_you_page_size)?;
        validate::positive_u32("feeds", "news_page_size", self.feeds.news_page_size)?;
        validate::positive_u32(
            "feeds",
            "bookmarks_page_size",
            self.feeds.bookmarks_page_size,
        )?;
        validate::ratio("tracking", "view_threshold", self.tracking.view_threshold)?;
        validate::positive_f64("playback", "rewind_secs", self.playback.rewind_secs)?;
        validate::positive_f64("playback", "default_speed", self.playback.default_speed)?;
        Ok(())
    }

    /// Whether the scroll resolver may request more pages.
    #[must_use]
    pub const fn infinite_scroll(&self) -> bool {
        !self.api.use_mock_data
    }
}

/// Feed API location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against.
    pub base_url: Url,
    /// Serve a static built-in feed instead of the live API.
    pub use_mock_data: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(defaults::API_BASE_URL).expect("default API URL is valid"),
            use_mock_data: false,
        }
    }
}

/// Pagination and cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedTuning {
    /// Items per For You page.
    pub for_you_page_size: u32,
    /// Slides per News page.
    pub news_page_size: u32,
    /// Items per bookmarks page.
    pub bookmarks_page_size: u32,
    /// Seconds before loaded pages are stale.
    pub stale_time_secs: u64,
    /// Extra attempts for failed page requests.
    pub retry: u32,
    /// Base retry delay in milliseconds; zero retries immediately.
    pub retry_delay_ms: u64,
}

impl FeedTuning {
    /// Freshness window as a [`Duration`].
    #[must_use]
    pub const fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    /// Base retry delay as a [`Duration`].
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for FeedTuning {
    fn default() -> Self {
        Self {
            for_you_page_size: defaults::FOR_YOU_PAGE_SIZE,
            news_page_size: defaults::NEWS_PAGE_SIZE,
            bookmarks_page_size: defaults::BOOKMARKS_PAGE_SIZE,
            stale_time_secs: defaults::STALE_TIME_SECS,
            retry: defaults::FETCH_RETRY,
            retry_delay_ms: defaults::FETCH_RETRY_DELAY_MS,
        }
    }
}

/// View tracking behaviour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Visible fraction in (0, 1] required before a view fires.
    pub view_threshold: f64,
    /// Fire at most once per mounted item.
    pub track_once: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            view_threshold: defaults::VIEW_THRESHOLD,
            track_once: defaults::TRACK_ONCE,
        }
    }
}

/// Playback defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seconds skipped backwards by rewind.
    pub rewind_secs: f64,
    /// Initial playback rate.
    pub default_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rewind_secs: defaults::REWIND_SECS,
            default_speed: defaults::PLAYBACK_SPEED,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level directive passed to the env filter.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: lumen_telemetry::DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LumenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feeds.stale_time(), Duration::from_secs(60));
        assert_eq!(config.feeds.for_you_page_size, 20);
        assert_eq!(config.feeds.news_page_size, 10);
        assert!(config.infinite_scroll());
    }

    #[test]
    fn mock_mode_disables_infinite_scroll() {
        let mut config = LumenConfig::default();
        config.api.use_mock_data = true;
        assert!(!config.infinite_scroll());
    }
}
