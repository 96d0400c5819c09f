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

//! src/core/parser.rs
//!
//! Rules file parser
//!
//! This module parses remap rules files. It handles:
//! - Conditions (`remap[alone]`, `remap[combination]`)
//! - Application scopes (`remap@code.exe`)
//! - Key and shortcut sources/targets (`CapsLock`, `Ctrl+Shift+K`, `Null`)
//! - Variable substitution (`$hyper = Ctrl+Alt+Shift`)
//! - Comments and whitespace
//! - Line numbers for error reporting
//!
//! # Architecture
//! The parser uses nom combinators for the line structure and the key name
//! table for individual keys. It performs two-pass parsing:
//! 1. First pass: Collect variable definitions
//! 2. Second pass: Parse rules with variable substitution
//!
//! `format_rules` is the inverse used when saving.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
};
use nom::{
    character::complete::{char, space0},
    combinator::{map, opt},
};
use nom::{
    sequence::{delimited, preceded},
    IResult, Parser,
};
use std::{collections::HashMap, path::Path};
use thiserror::Error;

use crate::core::keys::key_from_name;
use crate::core::types::{
    Condition, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget, Scope, Shortcut,
};

/// Parse errors with line number context
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error on line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },

    #[error("Unknown key '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    #[error("Invalid shortcut '{shortcut}' on line {line}: more than one non-modifier key")]
    InvalidShortcut { shortcut: String, line: usize },

    #[error("Undefined variable '${variable}' on line {line}")]
    UndefinedVariable { variable: String, line: usize },

    #[error("IO error reading rules: {0}")]
    IoError(#[from] std::io::Error),
}

/// Structure of one rule line before key names are resolved
#[derive(Debug, PartialEq)]
pub struct RuleLine<'a> {
    pub condition: Condition,
    pub scope: Scope,
    pub source: &'a str,
    pub target: &'a str,
}

/// Parse a complete rules file
///
/// # Arguments
/// * `content` - The full rules file content as a string
/// * `file_path` - Path to the rules file (for log messages)
///
/// # Returns
/// The rules in file order, or the first ParseError
///
/// # Example
/// ```ignore
/// let content = std::fs::read_to_string("remaps.conf")?;
/// let buffer = parse_rules_file(&content, Path::new("remaps.conf"))?;
/// ```
pub fn parse_rules_file(content: &str, file_path: &Path) -> Result<RemapBuffer, ParseError> {
    // First pass: Collect variable definitions
    let variables = collect_variables(content);

    // Second pass: Parse rules with variable substitution
    let mut buffer = RemapBuffer::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1; // Human-readable numbers start at 1

        // Skip empty lines, comments and variable definitions
        let line_trimmed = line.trim();
        if line_trimmed.is_empty()
            || line_trimmed.starts_with('#')
            || line_trimmed.starts_with('$')
        {
            continue;
        }

        let substituted = substitute_variables(line_trimmed, &variables);
        if let Some(variable) = undefined_variable(&substituted) {
            return Err(ParseError::UndefinedVariable {
                variable,
                line: line_num,
            });
        }

        let parsed = match parse_rule_line(&substituted) {
            Ok((_, parsed)) => parsed,
            Err(e) => {
                return Err(ParseError::InvalidSyntax {
                    line: line_num,
                    message: format!("{:?}", e),
                });
            }
        };

        buffer.push(resolve_rule(parsed, line_num)?);
    }

    tracing::debug!("Parsed {} rules from {}", buffer.len(), file_path.display());
    Ok(buffer)
}

/// Collect variable definitions from a rules file
///
/// Rules files may define variables like:
/// ```text
/// $hyper = Ctrl+Alt+Shift+Win
/// $editor = code.exe
/// ```
///
/// Returns a HashMap mapping variable names to their values
pub fn collect_variables(contents: &str) -> HashMap<String, String> {
    let mut variables = HashMap::new();

    for line in contents.lines() {
        let line_trimmed = line.trim();

        // Variable definition format: $name = value
        if let Some(definition) = line_trimmed.strip_prefix('$') {
            if let Some((name, value)) = definition.split_once('=') {
                variables.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    variables
}

/// Substitute variables in a line
///
/// Replaces $varName with its value. Longer names are substituted first so
/// `$mod2` is never clobbered by `$mod`.
pub fn substitute_variables(line: &str, variables: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    let mut result = line.to_string();
    for name in names {
        let pattern = format!("${}", name);
        result = result.replace(&pattern, &variables[name]);
    }

    result
}

fn undefined_variable(line: &str) -> Option<String> {
    let start = line.find('$')? + 1;
    let name: String = line[start..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    Some(name)
}

/// Parse a single rule line
///
/// Format: remap[CONDITION]@PROCESS = SOURCE, TARGET
/// Example: remap[alone]@code.exe = CapsLock, Escape
pub fn parse_rule_line(input: &str) -> IResult<&str, RuleLine<'_>> {
    let (input, _) = tag("remap")(input)?;
    let (input, condition) =
        opt(delimited(char('['), parse_condition, char(']'))).parse(input)?;
    let (input, process) = opt(preceded(
        char('@'),
        take_while1(|c: char| !c.is_whitespace() && c != '='),
    ))
    .parse(input)?;
    let (input, _) = (space0, char('='), space0).parse(input)?;
    let (input, source) = take_until(",")(input)?;
    let (target, _) = (space0, char(','), space0).parse(input)?;

    // Target runs to the end of the line
    Ok((
        "",
        RuleLine {
            condition: condition.unwrap_or_default(),
            scope: process.map(Scope::app).unwrap_or_default(),
            source: source.trim(),
            target: target.trim(),
        },
    ))
}

/// Parse a condition name (always, alone, combination)
pub fn parse_condition(input: &str) -> IResult<&str, Condition> {
    map(
        alt((tag("always"), tag("alone"), tag("combination"))),
        |s: &str| match s {
            "alone" => Condition::Alone,
            "combination" => Condition::Combination,
            _ => Condition::Always,
        },
    )
    .parse(input)
}

/// Parse `+`-separated key names
///
/// Returns the keys in written order, or the first name that is not a key.
pub fn parse_keys(input: &str) -> Result<Vec<KeyCode>, String> {
    input
        .split('+')
        .map(|part| key_from_name(part).ok_or_else(|| part.trim().to_string()))
        .collect()
}

/// Parse a shortcut like `Ctrl+Shift+K`
///
/// The result may be incomplete (`Ctrl+Shift`); completeness is the
/// validator's call. More than one non-modifier key is a syntax error.
pub fn parse_shortcut(input: &str, line: usize) -> Result<Shortcut, ParseError> {
    let keys = parse_keys(input).map_err(|key| ParseError::UnknownKey { key, line })?;

    if keys.iter().filter(|k| !k.is_modifier()).count() > 1 {
        return Err(ParseError::InvalidShortcut {
            shortcut: input.to_string(),
            line,
        });
    }

    Ok(Shortcut::new(keys))
}

fn resolve_rule(parsed: RuleLine<'_>, line: usize) -> Result<RemapRule, ParseError> {
    let source = if parsed.source.contains('+') {
        RemapSource::Chord(parse_shortcut(parsed.source, line)?)
    } else {
        RemapSource::Key(resolve_key(parsed.source, line)?)
    };

    let target = if parsed.target.contains('+') {
        RemapTarget::Chord(parse_shortcut(parsed.target, line)?)
    } else {
        RemapTarget::Key(resolve_key(parsed.target, line)?)
    };

    Ok(RemapRule {
        source,
        target,
        scope: parsed.scope,
        condition: parsed.condition,
    })
}

fn resolve_key(name: &str, line: usize) -> Result<KeyCode, ParseError> {
    key_from_name(name).ok_or_else(|| ParseError::UnknownKey {
        key: name.to_string(),
        line,
    })
}

/// Render a buffer in rules file syntax, one rule per line.
pub fn format_rules(buffer: &RemapBuffer) -> String {
    let mut out = String::from("# Managed by keyremap\n");
    for rule in buffer {
        out.push_str(&rule.to_string());
        out.push('\n');
    }
    out
}
