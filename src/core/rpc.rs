//! RPC client seam and helpers for background operation results.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::RpcError;

/// Call-by-name client for the node under test.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Invoke `method` with positional `params` and return the decoded result.
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError>;

    /// Endpoint the client talks to.
    fn url(&self) -> &str;
}

#[async_trait]
impl<C> RpcClient for std::sync::Arc<C>
where
    C: RpcClient + ?Sized,
{
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        (**self).call(method, params).await
    }

    fn url(&self) -> &str {
        (**self).url()
    }
}

/// Operation id returned by an async call: either the bare string or an
/// object carrying it under `opid`.
#[must_use]
pub fn operation_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("opid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Whether a poll result reports at least one completed operation.
#[must_use]
pub fn has_completed_results(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }
}

/// Terminal state of a background operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Finished successfully with this result payload.
    Success(Value),
    /// Failed with this message.
    Failed(String),
    /// Cancelled before it ran.
    Cancelled,
    /// Any other status string reported by the node.
    Other(String),
}

impl OperationOutcome {
    /// Interpret one entry of a poll result.
    #[must_use]
    pub fn from_entry(entry: &Value) -> Self {
        match entry.get("status").and_then(Value::as_str) {
            Some("success") => Self::Success(entry.get("result").cloned().unwrap_or(Value::Null)),
            Some("failed") => Self::Failed(
                entry
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            ),
            Some("cancelled") => Self::Cancelled,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }

    /// Whether the operation will not change state again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Ids of the entries in a poll result that have reached a terminal state.
#[must_use]
pub fn terminal_operation_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|entry| OperationOutcome::from_entry(entry).is_terminal())
                .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
