// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session store: insertion-ordered, with a lock per session so
//! that one session's mutation never blocks reads of another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use trails_core::{EngineError, Session, SessionFilter, SessionUpdate};

struct Inner {
    sessions: RwLock<HashMap<String, Arc<RwLock<Session>>>>,
    order: RwLock<Vec<String>>,
}

/// Registry-wide operations take the `order`/`sessions` locks only long
/// enough to clone an `Arc` or splice the order list; session data itself
/// is read or mutated under that session's own lock, so `get`/`list` never
/// hold up a concurrent `update` of a different session.
pub struct SessionRegistry {
    inner: Inner,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        SessionRegistry {
            inner: Inner {
                sessions: RwLock::new(HashMap::new()),
                order: RwLock::new(Vec::new()),
            },
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) {
        let id = session.id.as_str().to_string();
        self.inner
            .sessions
            .write()
            .insert(id.clone(), Arc::new(RwLock::new(session)));
        self.inner.order.write().push(id);
    }

    fn entry(&self, id: &str) -> Option<Arc<RwLock<Session>>> {
        self.inner.sessions.read().get(id).cloned()
    }

    /// Snapshot copy — never the interior aliased record.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.entry(id).map(|entry| entry.read().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.sessions.read().contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.inner.sessions.read().len()
    }

    /// Snapshot copies in insertion order.
    pub fn list(&self, filter: &SessionFilter) -> Vec<Session> {
        let order = self.inner.order.read().clone();
        let sessions = self.inner.sessions.read();
        order
            .iter()
            .filter_map(|id| sessions.get(id))
            .map(|entry| entry.read().clone())
            .filter(|session| filter.matches(session))
            .collect()
    }

    /// Returns the removed session, if it existed.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let removed = self.inner.sessions.write().remove(id);
        if removed.is_some() {
            self.inner.order.write().retain(|existing| existing != id);
        }
        removed.map(|entry| entry.read().clone())
    }

    /// Applies the whitelisted subset of fields; unknown keys in the
    /// caller's payload were already dropped by the protocol layer, so this
    /// only ever sees `name`/`status`/`branch`/`environment`.
    pub fn update(
        &self,
        id: &str,
        updates: &SessionUpdate,
        now_rfc3339: impl Fn() -> String,
    ) -> Result<Session, EngineError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| EngineError::NotFound(format!("session not found: {id}")))?;
        let mut session = entry.write();
        if let Some(name) = &updates.name {
            session.name = name.clone();
        }
        if let Some(status) = updates.status {
            session.status = status;
        }
        if let Some(branch) = &updates.branch {
            session.branch = branch.clone();
        }
        if let Some(environment) = &updates.environment {
            session.environment = environment.clone();
        }
        let now = now_rfc3339();
        session.updated_at = now.clone();
        session.last_activity = now;
        Ok(session.clone())
    }

    pub fn set_status(
        &self,
        id: &str,
        status: trails_core::SessionStatus,
        now_rfc3339: impl Fn() -> String,
    ) -> Result<Session, EngineError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| EngineError::NotFound(format!("session not found: {id}")))?;
        let mut session = entry.write();
        session.status = status;
        let now = now_rfc3339();
        session.updated_at = now.clone();
        session.last_activity = now;
        Ok(session.clone())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
