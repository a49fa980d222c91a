//! Tests for configuration validation

use admission_lease::config::{AdmissionConfig, SchedulerConfig};
use admission_lease::core::{CallClass, ConfigError, PairingPolicy};

#[test]
fn test_admission_config_defaults() {
    let config = AdmissionConfig::default();
    assert_eq!(config.endpoint(), "127.0.0.1:8888");
    assert_eq!(config.lease_size, 16);
    assert_eq!(config.pairing, PairingPolicy::SharedBudget);
    assert!(config.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_admission_config_invalid_port() {
    let invalid = AdmissionConfig {
        port: 0,
        ..AdmissionConfig::default()
    };
    assert!(matches!(invalid.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_admission_config_invalid_timeout() {
    let invalid = AdmissionConfig {
        timeout_ms: 0,
        ..AdmissionConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_admission_config_invalid_attempts() {
    let invalid = AdmissionConfig {
        max_attempts: 0,
        ..AdmissionConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_admission_config_from_json() {
    let json = r#"{
        "host": "10.1.2.3",
        "port": 9000,
        "lease_size": 8,
        "pairing": "per_operation",
        "overrides": { "getblocktemplate": "sync_heavy", "generate": "plain" }
    }"#;

    let config = AdmissionConfig::from_json_str(json).unwrap();
    assert_eq!(config.endpoint(), "10.1.2.3:9000");
    assert_eq!(config.lease_size, 8);
    assert_eq!(config.pairing, PairingPolicy::PerOperation);
    assert_eq!(config.overrides["getblocktemplate"], CallClass::SyncHeavy);
    assert_eq!(config.timeout_ms, AdmissionConfig::default().timeout_ms);
}

#[test]
fn test_admission_config_rejects_unknown_class() {
    let json = r#"{ "overrides": { "generate": "very_heavy" } }"#;
    assert!(matches!(
        AdmissionConfig::from_json_str(json),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_scheduler_config_validation() {
    let config = SchedulerConfig::default();
    assert!(config.max_cores > 0);
    assert!(config.validate().is_ok());

    let invalid = SchedulerConfig {
        max_cores: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{ "bind_host": "0.0.0.0", "port": 7777, "max_cores": 64 }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.bind_addr(), "0.0.0.0:7777");
    assert_eq!(config.max_cores, 64);
    assert_eq!(config.audit_capacity, 1024);
}

// The environment is process-global, so every env-driven assertion lives in
// one test.
#[test]
fn test_config_from_env() {
    std::env::set_var("ADMISSION_PORT", "9911");
    std::env::set_var("ADMISSION_ENABLED", "off");
    std::env::set_var("ADMISSION_PAIRING", "per_operation");
    std::env::set_var("SCHEDULER_MAX_CORES", "12");

    let admission = AdmissionConfig::from_env().unwrap();
    assert_eq!(admission.port, 9911);
    assert!(!admission.enabled);
    assert_eq!(admission.pairing, PairingPolicy::PerOperation);
    assert_eq!(SchedulerConfig::from_env().unwrap().max_cores, 12);

    std::env::set_var("ADMISSION_PORT", "not-a-port");
    assert!(matches!(
        AdmissionConfig::from_env(),
        Err(ConfigError::Env { ref key, .. }) if key == "ADMISSION_PORT"
    ));

    for key in [
        "ADMISSION_PORT",
        "ADMISSION_ENABLED",
        "ADMISSION_PAIRING",
        "SCHEDULER_MAX_CORES",
    ] {
        std::env::remove_var(key);
    }
}
