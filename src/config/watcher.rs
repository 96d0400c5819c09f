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

//! File system watcher for live rules reload
//!
//! Uses OS-level file watching via the notify crate. The parent directory is
//! watched rather than the file, since editors and `ConfigTransaction` both
//! replace the file by rename, which would orphan a watch on the file itself.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    ffi::OsString,
    path::Path,
    sync::mpsc::{channel, Receiver, RecvTimeoutError},
    time::Duration,
};

use crate::config::ConfigError;

/// Watches the rules file for modifications
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    file_name: OsString,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            file_name,
        })
    }

    /// Checks for file modification events (non-blocking)
    pub fn check_for_changes(&self) -> bool {
        let mut changed = false;
        while let Ok(event_result) = self.rx.try_recv() {
            changed |= self.is_relevant(event_result);
        }
        changed
    }

    /// Blocks until the file changes or `timeout` elapses.
    ///
    /// Events already queued behind the first relevant one are drained, so a
    /// burst of writes reports a single change. Returns false on timeout or
    /// if the watcher has shut down.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(event_result) => {
                    if self.is_relevant(event_result) {
                        self.check_for_changes();
                        return true;
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn is_relevant(&self, event_result: notify::Result<Event>) -> bool {
        let Ok(event) = event_result else {
            return false;
        };

        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }
}
