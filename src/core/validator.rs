// Copyright 2025 bakri (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rule buffer validation
//!
//! Validation is a pure function over the buffer and runs on every attempted
//! save. A buffer is accepted or rejected as a unit:
//! - Every shortcut, source or target, must be complete (modifier + terminal key)
//! - A source key may not be `Null`
//! - No two rules in the same (scope, condition) pair may claim the same
//!   physical source (see `core::conflict`)
//!
//! `get_orphaned_keys` is advisory: it lists remapped keys that nothing in the
//! buffer produces any more, so the UI can warn before saving.

use thiserror::Error;

use crate::core::conflict::ConflictDetector;
use crate::core::normalizer::overlaps;
use crate::core::types::{Condition, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget};

/// Coarse validation outcome reported back to the configuration surface
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemapErrorKind {
    NoError,
    RemapUnsuccessful,
}

/// Why a buffer was rejected
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Source row left empty
    #[error("Rule '{0}' has no source key")]
    MissingSource(String),

    /// Shortcut source without a modifier or terminal key
    #[error("Incomplete shortcut source '{0}': needs a modifier and a non-modifier key")]
    IncompleteSource(String),

    /// Shortcut target without a modifier or terminal key
    #[error("Incomplete shortcut target '{0}': needs a modifier and a non-modifier key")]
    IncompleteTarget(String),

    /// Two rules claim the same physical source
    #[error("Duplicate source '{trigger}' in scope '{scope}' ({condition}): {count} rules")]
    DuplicateSource {
        trigger: String,
        scope: String,
        condition: Condition,
        count: usize,
    },
}

/// Validates one rule in isolation.
pub fn validate_rule(rule: &RemapRule) -> Result<(), ValidationError> {
    match &rule.source {
        RemapSource::Key(key) if key.is_null() => {
            return Err(ValidationError::MissingSource(rule.to_string()));
        }
        RemapSource::Chord(shortcut) if !shortcut.is_complete() => {
            return Err(ValidationError::IncompleteSource(shortcut.to_string()));
        }
        _ => {}
    }

    if let RemapTarget::Chord(shortcut) = &rule.target {
        if !shortcut.is_complete() {
            return Err(ValidationError::IncompleteTarget(shortcut.to_string()));
        }
    }

    Ok(())
}

/// Validates a complete buffer, returning the first problem found.
///
/// Per-rule checks run first in buffer order, then duplicate detection.
pub fn validate_buffer(buffer: &RemapBuffer) -> Result<(), ValidationError> {
    let mut detector = ConflictDetector::new();

    for rule in buffer {
        validate_rule(rule)?;
        detector.add_rule(rule.clone());
    }

    if let Some(conflict) = detector.find_conflicts().into_iter().next() {
        return Err(ValidationError::DuplicateSource {
            trigger: conflict.source.to_string(),
            scope: conflict.scope.to_string(),
            condition: conflict.condition,
            count: conflict.conflicting_rules.len(),
        });
    }

    Ok(())
}

/// Checks whether a buffer may be saved and applied.
pub fn check_if_remappings_are_valid(buffer: &RemapBuffer) -> RemapErrorKind {
    match validate_buffer(buffer) {
        Ok(()) => RemapErrorKind::NoError,
        Err(_) => RemapErrorKind::RemapUnsuccessful,
    }
}

/// Lists single-key sources that no rule produces any more.
///
/// A source key `X` is orphaned iff no rule targets `X`, either as a plain key
/// target or as the terminal key of a shortcut target. Shortcut sources are
/// never reported. Disabled (`Null`-target) rules count like any other.
/// Keys are returned once each, in buffer order.
pub fn get_orphaned_keys(buffer: &RemapBuffer) -> Vec<KeyCode> {
    let produced: Vec<KeyCode> = buffer
        .iter()
        .filter_map(|rule| rule.target.terminal_key())
        .filter(|key| !key.is_null())
        .collect();

    let mut orphaned: Vec<KeyCode> = Vec::new();
    for rule in buffer {
        let RemapSource::Key(source) = rule.source else {
            continue;
        };

        if source.is_null() || orphaned.contains(&source) {
            continue;
        }

        if !produced.iter().any(|&target| overlaps(target, source)) {
            orphaned.push(source);
        }
    }

    orphaned
}
