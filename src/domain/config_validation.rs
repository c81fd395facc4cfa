//! Configuration validation.
//!
//! Checks the `[engine]` and `[window]` sections before any evaluation runs.

use crate::domain::error::ImpactError;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, NaiveDate, Utc};

pub const ENGINE_KEYS: [&str; 4] = [
    "max_operations",
    "max_call_levels",
    "max_expr_depth",
    "max_string_size",
];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ImpactError> {
    validate_engine_config(config)?;
    validate_window_config(config)?;
    Ok(())
}

/// Every engine limit that is set must be a positive integer.
pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), ImpactError> {
    for key in ENGINE_KEYS {
        if let Some(value) = config.get_string("engine", key) {
            parse_limit(&value, key)?;
        }
    }
    Ok(())
}

pub(crate) fn parse_limit(value: &str, key: &str) -> Result<u64, ImpactError> {
    match value.trim().parse::<u64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ImpactError::ConfigInvalid {
            section: "engine".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a positive integer"),
        }),
    }
}

/// The window is optional, but once either bound is set both must be set and
/// `start_date` must come before `end_date`.
pub fn validate_window_config(config: &dyn ConfigPort) -> Result<(), ImpactError> {
    let start = config.get_string("window", "start_date");
    let end = config.get_string("window", "end_date");
    if start.is_none() && end.is_none() {
        return Ok(());
    }

    let start_date = require_date(start.as_deref(), "window", "start_date")?;
    let end_date = require_date(end.as_deref(), "window", "end_date")?;
    if start_date >= end_date {
        return Err(ImpactError::ConfigInvalid {
            section: "window".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

fn require_date(value: Option<&str>, section: &str, key: &str) -> Result<DateTime<Utc>, ImpactError> {
    match value {
        None => Err(ImpactError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => parse_date(s).ok_or_else(|| ImpactError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("invalid {key} format, expected YYYY-MM-DD or RFC 3339"),
        }),
    }
}

/// Parses `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 instant.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
