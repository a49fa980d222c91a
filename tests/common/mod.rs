//! Shared test doubles: a scripted RPC node and a recording scheduler.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use admission_lease::core::{RpcClient, RpcError};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// RPC client answering from per-method scripts; unscripted calls return `null`.
#[derive(Default)]
pub struct ScriptedRpc {
    scripts: parking_lot::Mutex<HashMap<String, VecDeque<Result<Value, RpcError>>>>,
    calls: parking_lot::Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, method: &str, reply: Result<Value, RpcError>) {
        self.scripts
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn params_of(&self, index: usize) -> Vec<Value> {
        self.calls.lock()[index].1.clone()
    }
}

#[async_trait]
impl RpcClient for ScriptedRpc {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params.to_vec()));
        self.scripts
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(Value::Null))
    }

    fn url(&self) -> &str {
        "http://127.0.0.1:18232"
    }
}

pub fn remote_error(method: &str) -> RpcError {
    RpcError::RemoteCallFailed {
        method: method.to_string(),
        code: -6,
        message: "Insufficient funds".to_string(),
    }
}

/// Listener that records every request and acknowledges it, or stays silent.
pub struct RecordingScheduler {
    pub addr: SocketAddr,
    pub received: Arc<Mutex<Vec<String>>>,
}

impl RecordingScheduler {
    pub async fn start(acknowledge: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let mut buf = [0u8; 512];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    sink.lock()
                        .await
                        .push(String::from_utf8_lossy(&buf[..n]).into_owned());
                    if acknowledge {
                        let _ = stream.write_all(b"OK").await;
                    } else {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                });
            }
        });
        Self { addr, received }
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

/// An address nothing listens on: bind, read the port, drop the listener.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    addr.to_string()
}
