//! Config module tests
//!
//! Contains test suites for rules file management:
//! - ConfigManager loading and backup handling
//! - ConfigTransaction validated saves and rollback
//! - FileWatcher change notification


use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper: Creates a temporary rules file with the given content.
pub(crate) fn create_rules_file(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("remaps.conf");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}
