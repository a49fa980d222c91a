//! Tests for the lease audit trail

use admission_lease::core::{build_lease_event, AuditAction, InMemoryLeaseAudit, LeaseAuditSink};

#[test]
fn test_in_memory_lease_audit() {
    let mut sink = InMemoryLeaseAudit::new(10);

    let event = build_lease_event(
        AuditAction::Grant,
        16,
        Some("z_sendmany"),
        Some("127.0.0.1:50000".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].action, AuditAction::Grant);
    assert_eq!(events[0].count, 16);
}

#[test]
fn test_audit_overflow_drops_oldest() {
    let mut sink = InMemoryLeaseAudit::new(2);

    sink.record(build_lease_event(AuditAction::Grant, 1, None, None));
    sink.record(build_lease_event(AuditAction::Grant, 2, None, None));
    sink.record(build_lease_event(AuditAction::Release, 3, None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].count, 2);
    assert_eq!(events[1].action, AuditAction::Release);
}

#[test]
fn test_zero_capacity_keeps_nothing() {
    let mut sink = InMemoryLeaseAudit::new(0);
    sink.record(build_lease_event(AuditAction::Grant, 1, None, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_lease_event() {
    let event = build_lease_event(
        AuditAction::UnmatchedRelease,
        16,
        None,
        Some("127.0.0.1:1".to_string()),
    );

    assert_eq!(event.action, AuditAction::UnmatchedRelease);
    assert_eq!(event.count, 16);
    assert_eq!(event.tag, None);
    assert_eq!(event.peer.as_deref(), Some("127.0.0.1:1"));
    assert!(event.created_at_ms > 0);
    assert_ne!(event.event_id, build_lease_event(AuditAction::Grant, 1, None, None).event_id);
}

#[test]
fn test_audit_action_serializes_snake_case() {
    let json = serde_json::to_string(&AuditAction::RolledBack).unwrap();
    assert_eq!(json, "\"rolled_back\"");
    assert_eq!(AuditAction::UnmatchedRelease.to_string(), "unmatched_release");
}
