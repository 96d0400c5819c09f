// Copyright 2025 Eric Jingryd (tidynest@proton.me)
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

//! Parser module tests
//!
//! Tests for parsing remap rules files:
//! - Condition and application scope parsing
//! - Key and shortcut parsing
//! - Variable substitution
//! - Full rules file parsing and formatting

use crate::core::{
    parser::*,
    types::{Condition, KeyCode, RemapSource, RemapTarget, Scope, Shortcut},
};
use std::path::Path;

use super::{A, B, C, V};

#[test]
fn test_parse_condition() {
    assert!(matches!(parse_condition("alone]"), Ok(("]", Condition::Alone))));
    assert!(matches!(
        parse_condition("combination]"),
        Ok(("]", Condition::Combination))
    ));
    assert!(matches!(parse_condition("always"), Ok(("", Condition::Always))));
    assert!(parse_condition("sometimes").is_err());
}

#[test]
fn test_parse_rule_line_plain() {
    let (_, line) = parse_rule_line("remap = CapsLock, Escape").unwrap();
    assert_eq!(line.condition, Condition::Always);
    assert_eq!(line.scope, Scope::Global);
    assert_eq!(line.source, "CapsLock");
    assert_eq!(line.target, "Escape");
}

#[test]
fn test_parse_rule_line_with_condition_and_scope() {
    let (_, line) = parse_rule_line("remap[alone]@Code.exe = LShift, Ctrl+Shift+P").unwrap();
    assert_eq!(line.condition, Condition::Alone);
    assert_eq!(line.scope, Scope::App("code.exe".to_string()));
    assert_eq!(line.source, "LShift");
    assert_eq!(line.target, "Ctrl+Shift+P");
}

#[test]
fn test_parse_rule_line_rejects_missing_comma() {
    assert!(parse_rule_line("remap = CapsLock Escape").is_err());
    assert!(parse_rule_line("bind = SUPER, K").is_err());
}

#[test]
fn test_parse_keys() {
    assert_eq!(parse_keys("Ctrl+A"), Ok(vec![KeyCode::CONTROL, A]));
    assert_eq!(parse_keys("ctrl + shift + v"), Ok(vec![KeyCode::CONTROL, KeyCode::SHIFT, V]));
    assert_eq!(parse_keys("Ctrl+Banana"), Err("Banana".to_string()));
}

#[test]
fn test_parse_shortcut_rejects_two_terminal_keys() {
    assert!(matches!(
        parse_shortcut("Ctrl+A+B", 3),
        Err(ParseError::InvalidShortcut { line: 3, .. })
    ));
}

#[test]
fn test_parse_shortcut_keeps_incomplete_shortcut() {
    // Completeness is enforced by the validator, not the parser
    let shortcut = parse_shortcut("Ctrl+Alt", 1).unwrap();
    assert!(!shortcut.is_complete());
}

#[test]
fn test_variable_substitution() {
    let content = "$hyper = Ctrl+Alt+Shift\n$hyp = Win\n";
    let variables = collect_variables(content);
    assert_eq!(variables.get("hyper"), Some(&"Ctrl+Alt+Shift".to_string()));

    assert_eq!(
        substitute_variables("remap = $hyper+A, $hyp+A", &variables),
        "remap = Ctrl+Alt+Shift+A, Win+A"
    );
}

#[test]
fn test_parse_rules_file() {
    let content = r#"
# Editor remaps
$hyper = Ctrl+Alt+Shift

remap = CapsLock, Escape
remap[alone] = LShift, Null
remap@code.exe = $hyper+A, Ctrl+B
remap = C, Win+A
"#;

    let buffer = parse_rules_file(content, Path::new("remaps.conf")).unwrap();
    assert_eq!(buffer.len(), 4);

    let rules = buffer.rules();
    assert_eq!(rules[0].source, RemapSource::Key(KeyCode(0x14)));
    assert_eq!(rules[0].target, RemapTarget::Key(KeyCode(0x1B)));

    assert_eq!(rules[1].condition, Condition::Alone);
    assert!(rules[1].target.is_disabled());

    assert_eq!(rules[2].scope, Scope::app("code.exe"));
    assert_eq!(
        rules[2].source,
        RemapSource::Chord(Shortcut::new([
            KeyCode::CONTROL,
            KeyCode::ALT,
            KeyCode::SHIFT,
            A
        ]))
    );
    assert_eq!(
        rules[2].target,
        RemapTarget::Chord(Shortcut::new([KeyCode::CONTROL, B]))
    );

    assert_eq!(rules[3].source, RemapSource::Key(C));
    assert_eq!(
        rules[3].target,
        RemapTarget::Chord(Shortcut::new([KeyCode::WIN, A]))
    );
}

#[test]
fn test_parse_rules_file_reports_line_numbers() {
    let content = "remap = A, B\n\nremap = A, Banana\n";
    match parse_rules_file(content, Path::new("remaps.conf")) {
        Err(ParseError::UnknownKey { key, line }) => {
            assert_eq!(key, "Banana");
            assert_eq!(line, 3);
        }
        other => panic!("expected UnknownKey, got {:?}", other),
    }
}

#[test]
fn test_parse_rules_file_undefined_variable() {
    let content = "remap = $missing+A, B\n";
    assert!(matches!(
        parse_rules_file(content, Path::new("remaps.conf")),
        Err(ParseError::UndefinedVariable { line: 1, .. })
    ));
}

#[test]
fn test_parse_rules_file_invalid_syntax() {
    let content = "remap = A B\n";
    assert!(matches!(
        parse_rules_file(content, Path::new("remaps.conf")),
        Err(ParseError::InvalidSyntax { line: 1, .. })
    ));
}

#[test]
fn test_format_rules_parses_back() {
    let content = "remap[combination]@firefox.exe = Space, Ctrl\nremap = Ctrl+Alt+T, LWin+E\n";
    let buffer = parse_rules_file(content, Path::new("remaps.conf")).unwrap();

    let formatted = format_rules(&buffer);
    assert!(formatted.starts_with("# Managed by keyremap\n"));

    let reparsed = parse_rules_file(&formatted, Path::new("remaps.conf")).unwrap();
    assert_eq!(reparsed, buffer);
}
