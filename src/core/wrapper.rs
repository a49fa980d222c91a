//! Instrumented RPC client.
//!
//! [`InstrumentedClient`] exposes the same call-by-name surface as the
//! client it wraps. Around every call it:
//!
//! 1. classifies the operation,
//! 2. leases cores for heavy operations,
//! 3. forwards the call,
//! 4. returns the lease on every exit path (or hands it to a later poll for
//!    async operations),
//! 5. appends the operation name to the coverage log.
//!
//! Scheduler failures never reach the caller: acquiring degrades to advisory
//! mode with a warning, and an undeliverable relinquish is logged as a leak.
//! Errors from the wrapped call are returned unchanged.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::classifier::OPERATION_RESULT_METHOD;
use crate::core::coverage::CoverageLog;
use crate::core::rpc::{has_completed_results, operation_id, terminal_operation_ids};
use crate::core::{
    CallClass, CallClassifier, LeaseBackend, OperationOutcome, RpcClient, RpcError,
};
use crate::util::clock::now_ms;

/// How a completed poll is matched to outstanding async leases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Any non-empty poll result returns the oldest outstanding async lease,
    /// one per poll. Leases form a single shared budget.
    #[default]
    SharedBudget,
    /// A poll returns exactly the leases whose operation ids appear in its
    /// terminal result entries. A lease whose call returned no operation id
    /// is returned by the first terminal entry no other lease claims.
    PerOperation,
}

impl FromStr for PairingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared_budget" => Ok(Self::SharedBudget),
            "per_operation" => Ok(Self::PerOperation),
            other => Err(format!("unknown pairing policy `{other}`")),
        }
    }
}

/// An async lease waiting for its operation to complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingLease {
    /// Local handle.
    pub id: Uuid,
    /// Cores held.
    pub count: u32,
    /// Operation that acquired the lease.
    pub tag: String,
    /// Background operation id returned by the call, when one was found.
    pub operation_id: Option<String>,
    /// Acquisition time in milliseconds since epoch.
    pub acquired_at_ms: u128,
}

/// A granted lease scoped to one call.
///
/// Call [`release`](Self::release) or [`into_outstanding`](Self::into_outstanding)
/// to settle it. A guard dropped unsettled (the call future was cancelled, or
/// the call panicked) relinquishes in the background.
#[must_use = "an unsettled lease is released in the background on drop"]
pub struct LeaseGuard {
    backend: Arc<dyn LeaseBackend>,
    id: Uuid,
    count: u32,
    tag: String,
    acquired_at_ms: u128,
    settled: bool,
}

impl LeaseGuard {
    fn new(backend: Arc<dyn LeaseBackend>, count: u32, tag: &str) -> Self {
        Self {
            backend,
            id: Uuid::new_v4(),
            count,
            tag: tag.to_string(),
            acquired_at_ms: now_ms(),
            settled: false,
        }
    }

    /// Local handle of the lease.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Relinquish now.
    pub async fn release(mut self) {
        self.settled = true;
        relinquish_logged(self.backend.as_ref(), self.count, &self.tag).await;
    }

    /// Convert into a record to be settled by a later poll.
    pub fn into_outstanding(mut self, operation_id: Option<String>) -> OutstandingLease {
        self.settled = true;
        OutstandingLease {
            id: self.id,
            count: self.count,
            tag: std::mem::take(&mut self.tag),
            operation_id,
            acquired_at_ms: self.acquired_at_ms,
        }
    }
}

impl fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("id", &self.id)
            .field("count", &self.count)
            .field("tag", &self.tag)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let count = self.count;
        let tag = std::mem::take(&mut self.tag);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let backend = Arc::clone(&self.backend);
            handle.spawn(async move {
                relinquish_logged(backend.as_ref(), count, &tag).await;
            });
        } else {
            tracing::error!(
                leak = true,
                count,
                tag = %tag,
                "lease dropped outside a runtime; cores leaked"
            );
        }
    }
}

async fn relinquish_logged(backend: &dyn LeaseBackend, count: u32, tag: &str) {
    match backend.relinquish(count).await {
        Ok(()) => tracing::debug!(count, tag, "cores relinquished"),
        Err(e) => tracing::error!(
            leak = true,
            count,
            tag,
            endpoint = %backend.endpoint(),
            error = %e,
            "relinquish undeliverable; scheduler capacity leaked"
        ),
    }
}

/// RPC client wrapper inserting admission control and coverage logging.
pub struct InstrumentedClient<C> {
    inner: C,
    backend: Option<Arc<dyn LeaseBackend>>,
    classifier: CallClassifier,
    lease_size: u32,
    pairing: PairingPolicy,
    coverage: Option<CoverageLog>,
    outstanding: Mutex<VecDeque<OutstandingLease>>,
}

impl<C> InstrumentedClient<C>
where
    C: RpcClient,
{
    /// Wrap `inner` with the default classifier, a 16-core lease size, and
    /// no scheduler (every call runs in advisory mode).
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            backend: None,
            classifier: CallClassifier::with_defaults(),
            lease_size: crate::config::admission::DEFAULT_LEASE_SIZE,
            pairing: PairingPolicy::default(),
            coverage: None,
            outstanding: Mutex::new(VecDeque::new()),
        }
    }

    /// Lease cores from `backend`.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn LeaseBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: CallClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Cores leased per heavy operation.
    #[must_use]
    pub const fn with_lease_size(mut self, lease_size: u32) -> Self {
        self.lease_size = lease_size;
        self
    }

    /// Poll pairing policy.
    #[must_use]
    pub const fn with_pairing(mut self, pairing: PairingPolicy) -> Self {
        self.pairing = pairing;
        self
    }

    /// Append every successful operation name to `path`.
    #[must_use]
    pub fn with_coverage_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.coverage = Some(CoverageLog::new(path));
        self
    }

    /// Endpoint of the wrapped client.
    pub fn url(&self) -> &str {
        self.inner.url()
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Active classifier.
    pub const fn classifier(&self) -> &CallClassifier {
        &self.classifier
    }

    /// Cores leased per heavy operation.
    pub const fn lease_size(&self) -> u32 {
        self.lease_size
    }

    /// Async leases not yet settled by a poll, oldest first.
    pub fn outstanding(&self) -> Vec<OutstandingLease> {
        self.outstanding.lock().iter().cloned().collect()
    }

    /// Invoke `method` with `params` under admission control.
    ///
    /// # Errors
    ///
    /// Returns the wrapped client's error unchanged, after any lease taken
    /// for this call has been relinquished.
    pub async fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let class = self.classifier.classify(method);
        tracing::debug!(method, %class, "dispatching rpc call");

        let lease = if class.is_heavy() {
            self.acquire(method).await
        } else {
            None
        };

        let value = match self.inner.call(method, params).await {
            Ok(value) => value,
            Err(err) => {
                if let Some(lease) = lease {
                    lease.release().await;
                }
                return Err(err);
            }
        };

        match class {
            CallClass::SyncHeavy => {
                if let Some(lease) = lease {
                    lease.release().await;
                }
            }
            CallClass::AsyncHeavy => {
                if let Some(lease) = lease {
                    let record = lease.into_outstanding(operation_id(&value));
                    if record.operation_id.is_none() && self.pairing == PairingPolicy::PerOperation {
                        tracing::warn!(
                            method,
                            lease = %record.id,
                            "async result carried no operation id; lease settles on the next unclaimed completion"
                        );
                    }
                    tracing::debug!(
                        method,
                        lease = %record.id,
                        operation = record.operation_id.as_deref().unwrap_or(""),
                        "lease handed off until the operation completes"
                    );
                    self.outstanding.lock().push_back(record);
                }
            }
            CallClass::Poll => self.settle_completed(&value).await,
            CallClass::Plain => {}
        }

        self.record_coverage(method);
        Ok(value)
    }

    /// Poll [`OPERATION_RESULT_METHOD`] for `operation_id` until it reports a
    /// result, at most `max_polls` times, sleeping `interval` in between.
    ///
    /// Every poll goes through [`invoke`](Self::invoke), so the async lease
    /// is returned by the normal poll path. Returns `None` when the
    /// operation never completed.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a poll.
    pub async fn wait_for_operation(
        &self,
        operation_id: &str,
        max_polls: u32,
        interval: Duration,
    ) -> Result<Option<OperationOutcome>, RpcError> {
        tracing::debug!(operation = operation_id, "waiting for async operation");
        for attempt in 0..max_polls {
            if attempt > 0 {
                tokio::time::sleep(interval).await;
            }
            let polled = self
                .invoke(OPERATION_RESULT_METHOD, &[json!([operation_id])])
                .await?;
            let Some(entries) = polled.as_array().filter(|e| !e.is_empty()) else {
                continue;
            };
            let entry = entries
                .iter()
                .find(|e| e.get("id").and_then(Value::as_str) == Some(operation_id))
                .unwrap_or(&entries[0]);
            return Ok(Some(OperationOutcome::from_entry(entry)));
        }
        tracing::warn!(operation = operation_id, max_polls, "operation did not complete");
        Ok(None)
    }

    /// Relinquish every outstanding async lease. Returns how many were
    /// released.
    pub async fn release_all(&self) -> usize {
        let drained: Vec<OutstandingLease> = self.outstanding.lock().drain(..).collect();
        if let Some(backend) = &self.backend {
            for lease in &drained {
                relinquish_logged(backend.as_ref(), lease.count, &lease.tag).await;
            }
        }
        drained.len()
    }

    async fn acquire(&self, method: &str) -> Option<LeaseGuard> {
        let backend = self.backend.as_ref()?;
        match backend.acquire(self.lease_size, Some(method)).await {
            Ok(()) => {
                tracing::debug!(method, count = self.lease_size, "cores acquired");
                Some(LeaseGuard::new(Arc::clone(backend), self.lease_size, method))
            }
            Err(e) => {
                tracing::warn!(
                    method,
                    endpoint = %backend.endpoint(),
                    advisory = e.is_advisory(),
                    error = %e,
                    "admission control nonfunctional; proceeding without a lease"
                );
                None
            }
        }
    }

    async fn settle_completed(&self, polled: &Value) {
        if !has_completed_results(polled) {
            return;
        }
        let settled: Vec<OutstandingLease> = {
            let mut outstanding = self.outstanding.lock();
            match self.pairing {
                PairingPolicy::SharedBudget => outstanding.pop_front().into_iter().collect(),
                PairingPolicy::PerOperation => {
                    let mut settled = Vec::new();
                    for id in terminal_operation_ids(polled) {
                        // Completions no lease claims by id settle the oldest
                        // lease whose id was never known.
                        let pos = outstanding
                            .iter()
                            .position(|l| l.operation_id.as_deref() == Some(id.as_str()))
                            .or_else(|| outstanding.iter().position(|l| l.operation_id.is_none()));
                        if let Some(lease) = pos.and_then(|p| outstanding.remove(p)) {
                            settled.push(lease);
                        }
                    }
                    settled
                }
            }
        };

        if settled.is_empty() {
            tracing::debug!("completed poll matched no outstanding lease");
            return;
        }
        let Some(backend) = &self.backend else {
            return;
        };
        for lease in settled {
            tracing::debug!(
                lease = %lease.id,
                tag = %lease.tag,
                "operation completed; returning its lease"
            );
            relinquish_logged(backend.as_ref(), lease.count, &lease.tag).await;
        }
    }

    fn record_coverage(&self, method: &str) {
        if let Some(log) = &self.coverage {
            if let Err(e) = log.record(method) {
                tracing::warn!(
                    path = %log.path().display(),
                    error = %e,
                    "failed to append coverage record"
                );
            }
        }
    }
}

impl<C> fmt::Debug for InstrumentedClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedClient")
            .field("lease_size", &self.lease_size)
            .field("pairing", &self.pairing)
            .field("scheduler", &self.backend.as_ref().map(|b| b.endpoint()))
            .field("coverage", &self.coverage)
            .finish_non_exhaustive()
    }
}
