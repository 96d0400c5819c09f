//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Type tests (KeyCode, Shortcut, RemapRule)
//! - Rules file parsing tests
//! - Modifier normalisation tests
//! - Conflict detection tests
//! - Buffer validation and orphaned-key tests
//! - Table compilation tests

#[cfg(test)]
mod compiler_tests;
#[cfg(test)]
mod conflict_tests;
#[cfg(test)]
mod parser_tests;

use crate::core::types::{KeyCode, RemapRule, RemapSource, RemapTarget, Shortcut};

pub(crate) const A: KeyCode = KeyCode(0x41);
pub(crate) const B: KeyCode = KeyCode(0x42);
pub(crate) const C: KeyCode = KeyCode(0x43);
pub(crate) const D: KeyCode = KeyCode(0x44);
pub(crate) const V: KeyCode = KeyCode(0x56);

/// Helper: key -> key rule
pub(crate) fn key_rule(source: KeyCode, target: KeyCode) -> RemapRule {
    RemapRule::new(RemapSource::Key(source), RemapTarget::Key(target))
}

/// Helper: key -> shortcut rule
pub(crate) fn key_to_chord(source: KeyCode, target: &[KeyCode]) -> RemapRule {
    RemapRule::new(
        RemapSource::Key(source),
        RemapTarget::Chord(Shortcut::new(target.iter().copied())),
    )
}

/// Helper: shortcut -> shortcut rule
pub(crate) fn chord_rule(source: &[KeyCode], target: &[KeyCode]) -> RemapRule {
    RemapRule::new(
        RemapSource::Chord(Shortcut::new(source.iter().copied())),
        RemapTarget::Chord(Shortcut::new(target.iter().copied())),
    )
}

/// Helper: shortcut -> key rule
pub(crate) fn chord_to_key(source: &[KeyCode], target: KeyCode) -> RemapRule {
    RemapRule::new(
        RemapSource::Chord(Shortcut::new(source.iter().copied())),
        RemapTarget::Key(target),
    )
}
