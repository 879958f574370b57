//! Logging installation for the `lumen` binary and embedding hosts.
//!
//! # Design
//! - Engine crates only emit `tracing` events; nothing is printed until a
//!   host calls [`init_logging`] (the CLI does so for `--verbose`).
//! - Log lines go to stderr so they never interleave with command output.
//! - `RUST_LOG` takes precedence over the configured level.
//! - The first build SHA handed in wins for the life of the process.

use std::io;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Level applied when neither configuration nor `RUST_LOG` names one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Install the process-wide subscriber described by `config`.
///
/// # Errors
///
/// Fails with [`TelemetryError::SubscriberInstall`] when a global subscriber
/// is already in place.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let (json, pretty) = match config.format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(io::stderr),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(fmt::layer().compact().with_writer(io::stderr)),
        ),
    };
    tracing_subscriber::registry()
        .with(env_filter(config.level))
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|source| TelemetryError::SubscriberInstall { source })?;

    info!(build = build_sha(), format = ?config.format, "lumen logging enabled");
    Ok(())
}

/// Build SHA recorded by the first [`init_logging`] call, `dev` before that.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Inputs to [`init_logging`], borrowed from the host's settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive such as `info` or `lumen_feed_core=debug`.
    pub level: &'a str,
    /// Line format.
    pub format: LogFormat,
    /// Identifier of the running build.
    pub build_sha: &'a str,
}

/// Line format for emitted logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Compact human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty for debug builds, JSON for release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to [`LogFormat::infer`].
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::infer(),
        })
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
