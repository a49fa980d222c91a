//! Admission client configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::env;
use crate::core::{CallClass, ConfigError, PairingPolicy};

/// Default scheduler host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default scheduler port.
pub const DEFAULT_PORT: u16 = 8888;
/// Default cores leased per heavy operation.
pub const DEFAULT_LEASE_SIZE: u32 = 16;

/// Settings for talking to the core scheduler and sizing leases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Scheduler host.
    pub host: String,
    /// Scheduler port.
    pub port: u16,
    /// Bound on one request/acknowledgment exchange, in milliseconds.
    pub timeout_ms: u64,
    /// Cores leased per heavy operation.
    pub lease_size: u32,
    /// Connect attempts before degrading to advisory mode.
    pub max_attempts: u32,
    /// Initial delay between connect attempts; doubles each retry.
    pub backoff_ms: u64,
    /// How poll results are matched against async leases.
    pub pairing: PairingPolicy,
    /// When false no scheduler traffic is generated at all.
    pub enabled: bool,
    /// Extra classifier entries, applied over the built-in table.
    pub overrides: HashMap<String, CallClass>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: 300_000,
            lease_size: DEFAULT_LEASE_SIZE,
            max_attempts: 3,
            backoff_ms: 100,
            pairing: PairingPolicy::SharedBudget,
            enabled: true,
            overrides: HashMap::new(),
        }
    }
}

impl AdmissionConfig {
    /// `host:port` of the scheduler.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Exchange timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// First retry delay as a duration.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overlaid with `ADMISSION_*` environment variables (a `.env`
    /// file is honoured).
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable variables or invalid results.
    pub fn from_env() -> Result<Self, ConfigError> {
        env::load_dotenv();
        let mut cfg = Self::default();
        if let Some(host) = env::var("ADMISSION_HOST")? {
            cfg.host = host;
        }
        if let Some(port) = env::var("ADMISSION_PORT")? {
            cfg.port = port;
        }
        if let Some(timeout_ms) = env::var("ADMISSION_TIMEOUT_MS")? {
            cfg.timeout_ms = timeout_ms;
        }
        if let Some(lease_size) = env::var("ADMISSION_LEASE_SIZE")? {
            cfg.lease_size = lease_size;
        }
        if let Some(max_attempts) = env::var("ADMISSION_MAX_ATTEMPTS")? {
            cfg.max_attempts = max_attempts;
        }
        if let Some(backoff_ms) = env::var("ADMISSION_BACKOFF_MS")? {
            cfg.backoff_ms = backoff_ms;
        }
        if let Some(pairing) = env::var("ADMISSION_PAIRING")? {
            cfg.pairing = pairing;
        }
        if let Some(enabled) = env::flag("ADMISSION_ENABLED")? {
            cfg.enabled = enabled;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
