//! Environment variable overrides for configuration structs

use crate::errors::{Error, Result};
use std::str::FromStr;

/// Read and parse an environment variable.
///
/// Returns `Ok(None)` when the variable is unset or blank, and a
/// configuration error when it is set but cannot be parsed.
pub fn env_override<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(None),
    };

    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::configuration(format!("invalid value '{raw}' for {name}: {e}")))
}

/// Read a boolean flag, accepting the spellings people put in shell profiles
pub fn env_flag(name: &str) -> Result<Option<bool>> {
    let raw = match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(None),
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::configuration(format!(
            "invalid value '{raw}' for {name}: expected a boolean"
        ))),
    }
}
