//! Environment variable helpers shared by the config loaders.

use std::str::FromStr;

use crate::core::ConfigError;

/// Load `.env` once if present; missing files are ignored.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
    }
}

/// Read and parse `key`, returning `None` when it is unset or blank.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when the value does not parse.
pub fn var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Env {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(None),
    }
}

/// Read a boolean, accepting `1/0`, `true/false`, `yes/no`, `on/off`.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] for anything else.
pub fn flag(key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = var::<String>(key)? else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: raw,
        }),
    }
}
