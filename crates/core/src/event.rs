// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event envelope.
//!
//! Every command produces at least one terminal event. Metadata carries the
//! causal chain (`command_id` → `causation_id` → `correlation_id`) so a
//! consumer can reconstruct which command a given event answers even after
//! several hops through background tasks.

use serde::{Deserialize, Serialize};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionCreated,
    SessionDeleted,
    SessionUpdated,
    SessionList,
    StatusChanged,
    SystemInfo,
    SystemError,
    SystemHealthStatus,
    SystemStateSnapshot,
    SystemWarning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    pub worker_count: usize,
    pub active_sessions: usize,
    pub command_queue_depth: usize,
    pub event_queue_depth: usize,
}

/// Externally tagged by variant name (e.g. `{"session_created": {...}}`):
/// unambiguous even where two variants share a field shape, unlike an
/// untagged representation would be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    SessionCreated {
        session: Session,
    },
    SessionDeleted {
        session_id: String,
    },
    SessionUpdated {
        session: Session,
    },
    SessionList {
        sessions: Vec<Session>,
    },
    StatusChanged {
        session_id: String,
        old_status: crate::session::SessionStatus,
        new_status: crate::session::SessionStatus,
        #[serde(default)]
        reason: Option<String>,
    },
    SystemInfo {
        message: String,
    },
    SystemError {
        code: String,
        message: String,
        #[serde(default)]
        details: Option<String>,
        recoverable: bool,
    },
    SystemHealthStatus {
        healthy: bool,
        details: HealthDetails,
    },
    SystemStateSnapshot {
        session_count: usize,
        snapshot_at: String,
    },
    SystemWarning {
        code: String,
        message: String,
    },
}

/// Causal + routing metadata carried alongside every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    pub correlation_id: String,
    pub causation_id: String,
    pub timestamp: u64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedEvent {
    pub metadata: EventMetadata,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: EventPayload,
}

/// Builds an `EnhancedEvent`, filling causal defaults the way spec.md's
/// command/event pairing requires: `correlation_id` defaults to the new
/// event's own id, and `causation_id` defaults to the command that caused
/// this event (or the event's own id, for events with no originating
/// command — background tasks).
pub struct EventBuilder {
    event_type: EventType,
    payload: EventPayload,
    command_id: Option<String>,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    source: String,
    session_id: Option<String>,
    user_id: Option<String>,
    tags: Vec<String>,
}

impl EventBuilder {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        EventBuilder {
            event_type,
            payload,
            command_id: None,
            correlation_id: None,
            causation_id: None,
            source: "engine".to_string(),
            session_id: None,
            user_id: None,
            tags: Vec::new(),
        }
    }

    pub fn command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = Some(command_id.into());
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn build(self, event_id: impl Into<String>, timestamp: u64) -> EnhancedEvent {
        let event_id = event_id.into();
        let causation_id = self
            .causation_id
            .or_else(|| self.command_id.clone())
            .unwrap_or_else(|| event_id.clone());
        let correlation_id = self.correlation_id.unwrap_or_else(|| event_id.clone());
        EnhancedEvent {
            metadata: EventMetadata {
                event_id,
                command_id: self.command_id,
                correlation_id,
                causation_id,
                timestamp,
                source: self.source,
                session_id: self.session_id,
                user_id: self.user_id,
                tags: self.tags,
            },
            event_type: self.event_type,
            payload: self.payload,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
