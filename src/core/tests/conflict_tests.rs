use crate::core::types::{Condition, KeyCode, RemapSource, Scope};
use crate::core::ConflictDetector;

use super::{chord_to_key, key_rule, A, B, C};

#[test]
fn test_no_conflicts_when_empty() {
    let detector = ConflictDetector::new();
    assert_eq!(detector.find_conflicts().len(), 0);
    assert_eq!(detector.total_rules(), 0);
}

#[test]
fn test_no_conflicts_with_unique_sources() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(key_rule(A, B));
    detector.add_rule(key_rule(B, C));
    detector.add_rule(chord_to_key(&[KeyCode::CONTROL, A], C));

    assert_eq!(detector.find_conflicts().len(), 0);
    assert_eq!(detector.total_rules(), 3);
}

#[test]
fn test_detects_simple_conflict() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(key_rule(A, B));
    detector.add_rule(key_rule(A, C));

    let conflicts = detector.find_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflicting_rules.len(), 2);
    assert_eq!(conflicts[0].source, RemapSource::Key(A));
    assert_eq!(conflicts[0].scope, Scope::Global);
    assert_eq!(conflicts[0].condition, Condition::Always);
}

#[test]
fn test_detects_triple_conflict() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(key_rule(A, B));
    detector.add_rule(key_rule(A, C));
    detector.add_rule(key_rule(A, KeyCode::NULL));

    let conflicts = detector.find_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflicting_rules.len(), 3);
}

#[test]
fn test_generic_shortcut_conflict_reported_once() {
    let mut detector = ConflictDetector::new();

    // Collides on both LCtrl+A and RCtrl+A
    detector.add_rule(chord_to_key(&[KeyCode::CONTROL, A], B));
    detector.add_rule(chord_to_key(&[KeyCode::CONTROL, A], C));

    assert_eq!(detector.find_conflicts().len(), 1);
}

#[test]
fn test_generic_and_side_specific_shortcut_conflict() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(chord_to_key(&[KeyCode::CONTROL, A], B));
    detector.add_rule(chord_to_key(&[KeyCode::RCONTROL, A], C));

    let conflicts = detector.find_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflicting_rules.len(), 2);
}

#[test]
fn test_has_conflict() {
    let mut detector = ConflictDetector::new();

    let first = key_rule(A, B);
    let second = key_rule(A, C);
    let unrelated = key_rule(B, C);

    detector.add_rule(first.clone());
    assert!(!detector.has_conflict(&first));

    detector.add_rule(second);
    detector.add_rule(unrelated.clone());
    assert!(detector.has_conflict(&first));
    assert!(!detector.has_conflict(&unrelated));
}

#[test]
fn test_null_source_never_indexed() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(key_rule(KeyCode::NULL, A));
    detector.add_rule(key_rule(KeyCode::NULL, B));

    assert!(detector.find_conflicts().is_empty());
    assert_eq!(detector.total_rules(), 2);
}

#[test]
fn test_scopes_are_independent() {
    let mut detector = ConflictDetector::new();

    detector.add_rule(key_rule(A, B));
    detector.add_rule(key_rule(A, C).in_app("code.exe"));
    detector.add_rule(key_rule(A, C).when(Condition::Combination));

    assert!(detector.find_conflicts().is_empty());
}
