//! Bounded core counter used by the scheduler.
//!
//! Acquirers park until enough cores are free and are woken whenever cores
//! are returned. All reads and updates of the counter happen under one lock,
//! so two concurrent acquirers can never both observe the same free
//! capacity.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Point-in-time view of a [`CorePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Configured capacity.
    pub max_cores: u32,
    /// Cores currently granted.
    pub in_use: u32,
    /// Acquirers parked waiting for capacity.
    pub waiting: usize,
    /// Grants since start.
    pub granted: u64,
    /// Releases since start.
    pub released: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    in_use: u32,
    waiting: usize,
    granted: u64,
    released: u64,
}

/// Shared pool of cores with park-until-available acquisition.
#[derive(Debug)]
pub struct CorePool {
    max_cores: u32,
    state: Mutex<PoolState>,
    released: Notify,
}

impl CorePool {
    /// Create a pool with `max_cores` of capacity.
    #[must_use]
    pub fn new(max_cores: u32) -> Self {
        Self {
            max_cores,
            state: Mutex::new(PoolState::default()),
            released: Notify::new(),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max_cores(&self) -> u32 {
        self.max_cores
    }

    /// Oversized requests are only admitted into an idle pool, otherwise
    /// they could never run.
    const fn fits(&self, in_use: u32, count: u32) -> bool {
        count == 0 || in_use == 0 || in_use.saturating_add(count) <= self.max_cores
    }

    /// Grant `count` cores if they are free right now.
    pub fn try_acquire(&self, count: u32) -> bool {
        let mut state = self.state.lock();
        if !self.fits(state.in_use, count) {
            return false;
        }
        state.in_use = state.in_use.saturating_add(count);
        state.granted += 1;
        true
    }

    /// Wait until `count` cores are free, then take them.
    ///
    /// Cancel-safe: dropping the future before it resolves takes nothing.
    pub async fn acquire(&self, count: u32) {
        let mut parked = None;
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(count) {
                return;
            }
            if parked.is_none() {
                parked = Some(ParkedGuard::new(&self.state));
                tracing::debug!(count, "acquire parked until cores are released");
            }
            notified.await;
        }
    }

    /// Return `count` cores and wake parked acquirers.
    ///
    /// Returns `false` when more cores were returned than were granted; the
    /// counter saturates at zero in that case.
    pub fn release(&self, count: u32) -> bool {
        let matched = {
            let mut state = self.state.lock();
            state.released += 1;
            if count > state.in_use {
                state.in_use = 0;
                false
            } else {
                state.in_use -= count;
                true
            }
        };
        if !matched {
            tracing::error!(
                count,
                "release exceeds granted cores; counter clamped to zero"
            );
        }
        self.released.notify_waiters();
        matched
    }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        PoolSnapshot {
            max_cores: self.max_cores,
            in_use: state.in_use,
            waiting: state.waiting,
            granted: state.granted,
            released: state.released,
        }
    }
}

/// Keeps the `waiting` gauge honest even when an acquire is cancelled.
struct ParkedGuard<'a> {
    state: &'a Mutex<PoolState>,
}

impl<'a> ParkedGuard<'a> {
    fn new(state: &'a Mutex<PoolState>) -> Self {
        state.lock().waiting += 1;
        Self { state }
    }
}

impl Drop for ParkedGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.waiting = state.waiting.saturating_sub(1);
    }
}
