//! Error types for admission control, RPC calls, and configuration.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while talking to the core scheduler.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// No connection to the scheduler could be established.
    #[error("scheduler unreachable at {endpoint}: {source}")]
    SchedulerUnreachable {
        /// `host:port` the client tried to reach.
        endpoint: String,
        /// Last connect error observed.
        #[source]
        source: std::io::Error,
    },
    /// The scheduler accepted the connection but never acknowledged.
    #[error("scheduler at {endpoint} did not acknowledge within {after:?}")]
    SchedulerTimeout {
        /// `host:port` of the scheduler.
        endpoint: String,
        /// Bound that elapsed.
        after: Duration,
    },
    /// A lease request could not be parsed.
    #[error("malformed lease request: {0}")]
    MalformedRequest(String),
    /// I/O failure after the connection was established.
    #[error("scheduler i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdmissionError {
    /// True when nothing reached the scheduler, so retrying cannot apply a
    /// request twice.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SchedulerUnreachable { .. })
    }

    /// True for the scheduler failures a caller degrades on: nothing could
    /// be reached, or nothing acknowledged in time.
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        matches!(
            self,
            Self::SchedulerUnreachable { .. } | Self::SchedulerTimeout { .. }
        )
    }
}

/// Errors raised by the wrapped RPC client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The node rejected or failed the call.
    #[error("rpc `{method}` failed ({code}): {message}")]
    RemoteCallFailed {
        /// Operation name.
        method: String,
        /// Node-reported error code.
        code: i64,
        /// Node-reported message.
        message: String,
    },
    /// The node could not be reached.
    #[error("rpc transport error: {0}")]
    Transport(String),
    /// The node answered with something the client could not decode.
    #[error("rpc decode error: {0}")]
    Decode(String),
}

/// Errors raised while writing coverage files.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Filesystem failure.
    #[error("coverage i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The `help` call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The `help` call returned something other than text.
    #[error("help output is not text")]
    HelpNotText,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// JSON input could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// An environment variable held an unusable value.
    #[error("environment variable {key} has invalid value `{value}`")]
    Env {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
