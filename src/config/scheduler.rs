//! Scheduler server configuration.

use serde::{Deserialize, Serialize};

use crate::config::admission::{DEFAULT_HOST, DEFAULT_PORT};
use crate::config::env;
use crate::core::ConfigError;

/// Settings for the core scheduler process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Address to bind.
    pub bind_host: String,
    /// Port to bind.
    pub port: u16,
    /// Total cores the pool hands out.
    pub max_cores: u32,
    /// Audit events kept in memory; zero disables the trail.
    pub audit_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_cores: u32::try_from(num_cpus::get()).unwrap_or(u32::MAX),
            audit_capacity: 1024,
        }
    }
}

impl SchedulerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_host.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_host must not be empty".into()));
        }
        if self.max_cores == 0 {
            return Err(ConfigError::Invalid("max_cores must be greater than 0".into()));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
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

    /// Defaults overlaid with `SCHEDULER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable variables or invalid results.
    pub fn from_env() -> Result<Self, ConfigError> {
        env::load_dotenv();
        let mut cfg = Self::default();
        if let Some(bind_host) = env::var("SCHEDULER_BIND_HOST")? {
            cfg.bind_host = bind_host;
        }
        if let Some(port) = env::var("SCHEDULER_PORT")? {
            cfg.port = port;
        }
        if let Some(max_cores) = env::var("SCHEDULER_MAX_CORES")? {
            cfg.max_cores = max_cores;
        }
        if let Some(audit_capacity) = env::var("SCHEDULER_AUDIT_CAPACITY")? {
            cfg.audit_capacity = audit_capacity;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
