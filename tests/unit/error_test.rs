//! Tests for error types

use std::io;
use std::time::Duration;

use admission_lease::core::{AdmissionError, ConfigError, CoverageError, RpcError};

#[test]
fn test_unreachable_error() {
    let err = AdmissionError::SchedulerUnreachable {
        endpoint: "127.0.0.1:8888".to_string(),
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    };
    assert!(format!("{err}").starts_with("scheduler unreachable at 127.0.0.1:8888"));
    assert!(err.is_retryable());
    assert!(err.is_advisory());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_timeout_error() {
    let err = AdmissionError::SchedulerTimeout {
        endpoint: "127.0.0.1:8888".to_string(),
        after: Duration::from_secs(2),
    };
    assert_eq!(
        format!("{err}"),
        "scheduler at 127.0.0.1:8888 did not acknowledge within 2s"
    );
    assert!(!err.is_retryable());
    assert!(err.is_advisory());
}

#[test]
fn test_io_error_is_neither_retryable_nor_advisory() {
    let err = AdmissionError::from(io::Error::from(io::ErrorKind::BrokenPipe));
    assert!(!err.is_retryable());
    assert!(!err.is_advisory());
}

#[test]
fn test_malformed_request_error() {
    let err = AdmissionError::MalformedRequest("bad count".to_string());
    assert_eq!(format!("{err}"), "malformed lease request: bad count");
}

#[test]
fn test_remote_call_failed_error() {
    let err = RpcError::RemoteCallFailed {
        method: "z_sendmany".to_string(),
        code: -6,
        message: "Insufficient funds".to_string(),
    };
    assert_eq!(format!("{err}"), "rpc `z_sendmany` failed (-6): Insufficient funds");
}

#[test]
fn test_coverage_error_wraps_rpc_transparently() {
    let rpc = RpcError::Transport("connection reset".to_string());
    let err = CoverageError::from(rpc.clone());
    assert_eq!(format!("{err}"), format!("{rpc}"));
}

#[test]
fn test_config_env_error() {
    let err = ConfigError::Env {
        key: "ADMISSION_PORT".to_string(),
        value: "http".to_string(),
    };
    assert_eq!(
        format!("{err}"),
        "environment variable ADMISSION_PORT has invalid value `http`"
    );
}
