// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session data model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use crate::id::SessionId;

/// Status of a session's agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Working,
    Waiting,
    Error,
    Thinking,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ready => "ready",
            SessionStatus::Working => "working",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Error => "error",
            SessionStatus::Thinking => "thinking",
        }
    }
}

/// A named, user-facing unit of work tied to one agent type and one
/// container environment. Persisted fields only; the process handle and
/// per-session lock live outside this struct (see `trails_engine::registry`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub agent: String,
    pub status: SessionStatus,
    pub environment_id: String,
    pub branch: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_activity: String,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Session {
    /// Invariant check used by tests and by the registry after mutation:
    /// `created_at ≤ updated_at ≤ last_activity` (string comparison is valid
    /// because all three are RFC3339 with a fixed-width millisecond field).
    pub fn timestamps_are_ordered(&self) -> bool {
        self.created_at <= self.updated_at && self.updated_at <= self.last_activity
    }
}

/// Fields of a session that `update_session` may change. Unknown keys in
/// the wire payload are ignored, not rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub environment: Option<HashMap<String, String>>,
}

/// Filter applied by `list_sessions`; `None` fields are not constrained.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<Vec<SessionStatus>>,
    pub agent: Option<String>,
    pub branch: Option<String>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(statuses) = &self.status {
            if !statuses.contains(&session.status) {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if &session.agent != agent {
                return false;
            }
        }
        if let Some(branch) = &self.branch {
            if &session.branch != branch {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
