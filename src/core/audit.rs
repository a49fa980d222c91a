//! Audit trail of scheduler lease decisions.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// What happened to a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Cores were granted and acknowledged.
    Grant,
    /// Cores were returned against an earlier grant.
    Release,
    /// Cores were returned with no grant outstanding.
    UnmatchedRelease,
    /// The client disconnected while parked, nothing was granted.
    Abandoned,
    /// A grant was rolled back because the client could not receive the
    /// acknowledgment.
    RolledBack,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grant => "grant",
            Self::Release => "release",
            Self::UnmatchedRelease => "unmatched_release",
            Self::Abandoned => "abandoned",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseEvent {
    /// Event identifier.
    pub event_id: String,
    /// Action taken.
    pub action: AuditAction,
    /// Cores involved.
    pub count: u32,
    /// Operation name from the acquire, if any.
    pub tag: Option<String>,
    /// Remote peer address.
    pub peer: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait LeaseAuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: LeaseEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryLeaseAudit {
    events: VecDeque<LeaseEvent>,
    max_events: usize,
}

impl InMemoryLeaseAudit {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<LeaseEvent> {
        self.events.iter().cloned().collect()
    }
}

impl LeaseAuditSink for InMemoryLeaseAudit {
    fn record(&mut self, event: LeaseEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event from context.
#[must_use]
pub fn build_lease_event(
    action: AuditAction,
    count: u32,
    tag: Option<&str>,
    peer: Option<String>,
) -> LeaseEvent {
    LeaseEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        action,
        count,
        tag: tag.map(str::to_string),
        peer,
        created_at_ms: now_ms(),
    }
}
