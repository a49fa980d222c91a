//! Tests for RPC coverage files

use std::sync::atomic::{AtomicUsize, Ordering};

use admission_lease::core::coverage::{CoverageLog, REFERENCE_FILENAME};
use admission_lease::core::{coverage_filename, write_all_rpc_commands, CoverageError, RpcClient, RpcError};
use async_trait::async_trait;
use serde_json::{json, Value};

struct HelpRpc {
    help: Value,
    calls: AtomicUsize,
}

#[async_trait]
impl RpcClient for HelpRpc {
    async fn call(&self, method: &str, _params: &[Value]) -> Result<Value, RpcError> {
        assert_eq!(method, "help");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.help.clone())
    }

    fn url(&self) -> &str {
        "http://node0"
    }
}

#[tokio::test]
async fn test_reference_list_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let rpc = HelpRpc {
        help: json!("== Control ==\nstop\ngetinfo\n\n== Wallet ==\nz_sendmany \"from\" [..]\n"),
        calls: AtomicUsize::new(0),
    };

    assert!(write_all_rpc_commands(dir.path(), &rpc).await.unwrap());
    assert!(!write_all_rpc_commands(dir.path(), &rpc).await.unwrap());

    let written = std::fs::read_to_string(dir.path().join(REFERENCE_FILENAME)).unwrap();
    assert_eq!(written, "getinfo\nstop\nz_sendmany\n");
    assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_text_help_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let rpc = HelpRpc {
        help: json!({"commands": []}),
        calls: AtomicUsize::new(0),
    };

    let err = write_all_rpc_commands(dir.path(), &rpc).await.unwrap_err();
    assert!(matches!(err, CoverageError::HelpNotText));
    assert!(!dir.path().join(REFERENCE_FILENAME).exists());
}

#[test]
fn test_coverage_log_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log = CoverageLog::new(coverage_filename(dir.path(), 0));

    log.record("getinfo").unwrap();
    log.record("z_sendmany").unwrap();

    assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "getinfo\nz_sendmany\n");
}

#[test]
fn test_coverage_filenames_differ_per_node() {
    let dir = tempfile::tempdir().unwrap();
    let first = coverage_filename(dir.path(), 0);
    let second = coverage_filename(dir.path(), 1);

    assert_ne!(first, second);
    assert!(first
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(&format!("coverage.pid{}", std::process::id())));
}
