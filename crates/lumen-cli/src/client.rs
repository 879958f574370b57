//! Shared command context and error type.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lumen_config::{ConfigError, LumenConfig, ProcessEnv};
use lumen_feed_core::{FeedEngine, SimulatedBackend};

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Validation(format!("{:#}", anyhow::Error::new(err)))
    }
}

pub(crate) struct AppContext {
    pub(crate) config: LumenConfig,
}

impl AppContext {
    /// Load configuration from `path` (when given) layered under `LUMEN_*`
    /// overrides.
    pub(crate) fn load(path: Option<&Path>) -> CliResult<Self> {
        let config = match path {
            Some(path) => LumenConfig::load_file(path, &ProcessEnv)?,
            None => LumenConfig::from_env()?,
        };
        Ok(Self { config })
    }

    #[cfg(test)]
    pub(crate) const fn with_config(config: LumenConfig) -> Self {
        Self { config }
    }

    pub(crate) fn backend(latency_ms: u64) -> SimulatedBackend {
        let latency = Duration::from_millis(latency_ms);
        SimulatedBackend::with_latency(latency, latency)
    }

    /// Engine over `backend`; `static_data` switches to the built-in data mode.
    pub(crate) fn engine(&self, backend: &SimulatedBackend, static_data: bool) -> FeedEngine {
        let mut config = self.config.clone();
        config.api.use_mock_data |= static_data;
        FeedEngine::new(
            &config,
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
        )
    }
}
