// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk persistence for engine state: periodic atomic-write snapshots,
//! load/restore at startup.
//!
//! Missing file on load is not an error — it produces an empty state.
//! Parse failures are fatal: a corrupt `state.json` means engine startup
//! returns an error rather than silently discarding state.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trails_core::Session;

pub const CURRENT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed state file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The on-disk shape at `<repo>/.trails/state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: String,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub focused_id: Option<String>,
    #[serde(default)]
    pub minimal_mode: bool,
    #[serde(default)]
    pub preferences: HashMap<String, String>,
    pub last_saved: String,
}

impl Default for PersistedState {
    fn default() -> Self {
        PersistedState {
            version: CURRENT_VERSION.to_string(),
            sessions: Vec::new(),
            focused_id: None,
            minimal_mode: false,
            preferences: HashMap::new(),
            last_saved: String::new(),
        }
    }
}

impl PersistedState {
    /// Build a snapshot from one atomic read of the registry and the
    /// engine's own focus/preferences fields. The caller must take this
    /// snapshot with locks released before calling out to `save` — state
    /// locks must never be held across I/O.
    pub fn snapshot(
        sessions: Vec<Session>,
        focused_id: Option<String>,
        minimal_mode: bool,
        preferences: HashMap<String, String>,
        last_saved: String,
    ) -> Self {
        PersistedState {
            version: CURRENT_VERSION.to_string(),
            sessions,
            focused_id,
            minimal_mode,
            preferences,
            last_saved,
        }
    }

    /// Replace only `{focused_id, minimal_mode, preferences}` from `other`.
    /// Session restoration is advisory — live containers may not survive a
    /// restart, so sessions are left untouched here.
    pub fn restore_from(&mut self, other: &PersistedState) {
        self.focused_id = other.focused_id.clone();
        self.minimal_mode = other.minimal_mode;
        self.preferences = other.preferences.clone();
    }
}

pub struct StatePersister {
    path: PathBuf,
}

impl StatePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatePersister { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file produces `PersistedState::default()`; a corrupt file is
    /// a fatal error, not silently discarded.
    pub fn load(&self) -> Result<PersistedState, StorageError> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let state = serde_json::from_reader(reader)?;
        Ok(state)
    }

    /// Atomic write: serialize to `state.json.tmp`, then rename over the
    /// target. Directory mode `0700`, file mode `0600` on unix.
    pub fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
            set_dir_permissions(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            set_file_permissions(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Call site for `set_preference`: accepted and acknowledged preference
    /// writes are not yet threaded through to durable storage.
    /// TODO: persist `(key, value)` into `PersistedState::preferences` and
    /// trigger (or wait for) the next `save` once that wiring exists.
    pub fn note_preference_hint(&self, _key: &str, _value: &str) {}
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "persister_tests.rs"]
mod tests;
