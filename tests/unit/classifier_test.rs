//! Tests for call classification

use std::str::FromStr;

use admission_lease::core::classifier::{DEFAULT_ASYNC_HEAVY, DEFAULT_SYNC_HEAVY};
use admission_lease::core::{CallClass, CallClassifier};

#[test]
fn test_default_table() {
    let classifier = CallClassifier::with_defaults();

    assert_eq!(classifier.names(CallClass::AsyncHeavy).len(), DEFAULT_ASYNC_HEAVY.len());
    assert_eq!(classifier.names(CallClass::SyncHeavy).len(), DEFAULT_SYNC_HEAVY.len());
    assert_eq!(classifier.names(CallClass::Poll), vec!["z_getoperationresult"]);
    assert_eq!(classifier.classify("getinfo"), CallClass::Plain);
}

#[test]
fn test_empty_classifier_is_all_plain() {
    let classifier = CallClassifier::empty();
    assert_eq!(classifier.classify("z_sendmany"), CallClass::Plain);
    assert!(classifier.names(CallClass::AsyncHeavy).is_empty());
}

#[test]
fn test_extend_overrides() {
    let mut classifier = CallClassifier::with_defaults();
    classifier.extend([
        ("z_sendmany", CallClass::SyncHeavy),
        ("getblocktemplate", CallClass::SyncHeavy),
    ]);

    assert_eq!(classifier.classify("z_sendmany"), CallClass::SyncHeavy);
    assert_eq!(
        classifier.names(CallClass::SyncHeavy),
        vec!["generate", "getblocktemplate", "z_sendmany", "zcrawjoinsplit"]
    );
}

#[test]
fn test_matching_is_exact() {
    let classifier = CallClassifier::with_defaults();
    assert_eq!(classifier.classify("Z_SENDMANY"), CallClass::Plain);
    assert_eq!(classifier.classify("z_sendmany "), CallClass::Plain);
}

#[test]
fn test_call_class_text_forms() {
    for class in [
        CallClass::Plain,
        CallClass::SyncHeavy,
        CallClass::AsyncHeavy,
        CallClass::Poll,
    ] {
        assert_eq!(CallClass::from_str(&class.to_string()), Ok(class));
    }
    assert!(CallClass::from_str("heavy").is_err());
    assert!(CallClass::AsyncHeavy.is_heavy());
    assert!(!CallClass::Poll.is_heavy());
}
