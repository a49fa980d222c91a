//! In-process lease backend.
//!
//! Records every request it is given, in wire form, and optionally applies
//! it to a local [`CorePool`]. Failures can be injected to exercise the
//! advisory and leak paths without a network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::protocol::{LeaseAction, LeaseRequest};
use crate::core::{AdmissionError, CorePool, LeaseBackend};

/// Lease backend living in the same process as its callers.
#[derive(Debug, Default)]
pub struct InMemoryLeaseBackend {
    pool: Option<Arc<CorePool>>,
    requests: Mutex<Vec<LeaseRequest>>,
    fail_acquire: AtomicBool,
    fail_relinquish: AtomicBool,
}

impl InMemoryLeaseBackend {
    /// Backend that only records requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that also applies requests to `pool`; acquires park until
    /// cores are free.
    #[must_use]
    pub fn with_pool(pool: Arc<CorePool>) -> Self {
        Self {
            pool: Some(pool),
            ..Self::default()
        }
    }

    /// Make acquires fail as if the scheduler were down.
    pub fn set_acquire_unreachable(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::Release);
    }

    /// Make relinquishes fail as if the scheduler were down.
    pub fn set_relinquish_unreachable(&self, fail: bool) {
        self.fail_relinquish.store(fail, Ordering::Release);
    }

    /// Requests that were delivered, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<LeaseRequest> {
        self.requests.lock().clone()
    }

    /// Delivered requests in wire form, e.g. `"16,A,z_sendmany"`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.requests.lock().iter().map(LeaseRequest::encode).collect()
    }

    /// Number of delivered requests with `action`.
    #[must_use]
    pub fn count(&self, action: LeaseAction) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.action == action)
            .count()
    }

    /// Forget recorded requests.
    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    fn unreachable(&self) -> AdmissionError {
        AdmissionError::SchedulerUnreachable {
            endpoint: LeaseBackend::endpoint(self),
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "in-memory scheduler marked unreachable",
            ),
        }
    }
}

#[async_trait]
impl LeaseBackend for InMemoryLeaseBackend {
    async fn acquire(&self, count: u32, tag: Option<&str>) -> Result<(), AdmissionError> {
        if self.fail_acquire.load(Ordering::Acquire) {
            return Err(self.unreachable());
        }
        if let Some(pool) = &self.pool {
            pool.acquire(count).await;
        }
        self.requests.lock().push(LeaseRequest::acquire(count, tag));
        Ok(())
    }

    async fn relinquish(&self, count: u32) -> Result<(), AdmissionError> {
        if self.fail_relinquish.load(Ordering::Acquire) {
            return Err(self.unreachable());
        }
        if let Some(pool) = &self.pool {
            pool.release(count);
        }
        self.requests.lock().push(LeaseRequest::relinquish(count));
        Ok(())
    }

    fn endpoint(&self) -> String {
        "in-memory".to_string()
    }
}
