//! Hook module tests
//!
//! Contains test suites for the runtime layer:
//! - Single-key remaps and conditions
//! - Shortcut engagement and disengagement
//! - Table generation changes and injection failures

#[cfg(test)]
mod shortcut_tests;
