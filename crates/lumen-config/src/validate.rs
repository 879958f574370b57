//! Validation helpers and parsing utilities for configuration values.

use url::Url;

use crate::error::{ConfigError, ConfigResult};

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn api_url(url: &Url) -> ConfigResult<()> {
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(ConfigError::invalid(
            "api",
            "base_url",
            url.to_string(),
            "missing_host",
        )),
        _ => Err(ConfigError::invalid(
            "api",
            "base_url",
            url.to_string(),
            "unsupported_scheme",
        )),
    }
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn positive_u32(section: &'static str, field: &'static str, value: u32) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(section, field, value.to_string(), "must_be_positive"));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn ratio(section: &'static str, field: &'static str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::invalid(section, field, value.to_string(), "out_of_range"));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn positive_f64(section: &'static str, field: &'static str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::invalid(section, field, value.to_string(), "must_be_positive"));
    }
    Ok(())
}

/// Parse a boolean flag using the spellings accepted in environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a recognised flag.
pub fn parse_bool(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(section, field, raw.to_string(), "not_a_boolean")),
    }
}

/// Parse any `FromStr` numeric override, tagging failures with the field.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value does not parse.
pub fn parse_number<T: std::str::FromStr>(
    section: &'static str,
    field: &'static str,
    raw: &str,
) -> ConfigResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(section, field, raw.to_string(), "not_a_number"))
}
