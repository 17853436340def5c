// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command envelope: the engine's single inbound wire shape.
//!
//! Decoding is two-phase: the envelope (`id`, `type`, `timestamp`) is read
//! first, then the raw `payload` value is decoded against the shape that
//! `type` names. A payload that doesn't fit its declared type fails to
//! decode rather than silently taking on some other command's meaning.

use std::collections::HashMap;
use std::fmt;

use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::session::{SessionFilter, SessionStatus, SessionUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    CreateSession,
    DeleteSession,
    UpdateSession,
    ListSessions,
    StartAgent,
    StopAgent,
    RestartAgent,
    SetFocus,
    NextActionable,
    ToggleMinimal,
    SetPreference,
    HealthCheck,
    Shutdown,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionPayload {
    pub name: String,
    pub agent: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteSessionPayload {
    pub session_id: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSessionPayload {
    pub session_id: String,
    pub updates: SessionUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSessionsPayload {
    #[serde(default)]
    pub status: Option<Vec<SessionStatus>>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl ListSessionsPayload {
    pub fn to_filter(&self) -> SessionFilter {
        SessionFilter {
            status: self.status.clone(),
            agent: self.agent.clone(),
            branch: self.branch.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPreferencePayload {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckPayload {
    #[serde(default)]
    pub include_details: bool,
}

/// Payload variants, one per `CommandType`. Variants carrying no data
/// (`NextActionable`, `ToggleMinimal`, `Shutdown`) still round-trip through
/// an empty JSON object so the envelope's `payload` field is always present.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    CreateSession(CreateSessionPayload),
    DeleteSession(DeleteSessionPayload),
    UpdateSession(UpdateSessionPayload),
    ListSessions(ListSessionsPayload),
    StartAgent(SessionIdPayload),
    StopAgent(SessionIdPayload),
    RestartAgent(SessionIdPayload),
    SetFocus(SessionIdPayload),
    NextActionable,
    ToggleMinimal,
    SetPreference(SetPreferencePayload),
    HealthCheck(HealthCheckPayload),
    Shutdown,
}

impl CommandPayload {
    pub fn matches_type(&self, command_type: CommandType) -> bool {
        matches!(
            (self, command_type),
            (CommandPayload::CreateSession(_), CommandType::CreateSession)
                | (CommandPayload::DeleteSession(_), CommandType::DeleteSession)
                | (CommandPayload::UpdateSession(_), CommandType::UpdateSession)
                | (CommandPayload::ListSessions(_), CommandType::ListSessions)
                | (CommandPayload::StartAgent(_), CommandType::StartAgent)
                | (CommandPayload::StopAgent(_), CommandType::StopAgent)
                | (CommandPayload::RestartAgent(_), CommandType::RestartAgent)
                | (CommandPayload::SetFocus(_), CommandType::SetFocus)
                | (CommandPayload::NextActionable, CommandType::NextActionable)
                | (CommandPayload::ToggleMinimal, CommandType::ToggleMinimal)
                | (CommandPayload::SetPreference(_), CommandType::SetPreference)
                | (CommandPayload::HealthCheck(_), CommandType::HealthCheck)
                | (CommandPayload::Shutdown, CommandType::Shutdown)
        )
    }

    /// Session the command targets, when it targets exactly one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            CommandPayload::DeleteSession(p) => Some(&p.session_id),
            CommandPayload::UpdateSession(p) => Some(&p.session_id),
            CommandPayload::StartAgent(p)
            | CommandPayload::StopAgent(p)
            | CommandPayload::RestartAgent(p)
            | CommandPayload::SetFocus(p) => Some(&p.session_id),
            _ => None,
        }
    }

    fn from_raw(command_type: CommandType, raw: serde_json::Value) -> Result<Self, String> {
        let map_err = |e: serde_json::Error| format!("{command_type} payload: {e}");
        Ok(match command_type {
            CommandType::CreateSession => {
                CommandPayload::CreateSession(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::DeleteSession => {
                CommandPayload::DeleteSession(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::UpdateSession => {
                CommandPayload::UpdateSession(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::ListSessions => {
                CommandPayload::ListSessions(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::StartAgent => {
                CommandPayload::StartAgent(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::StopAgent => {
                CommandPayload::StopAgent(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::RestartAgent => {
                CommandPayload::RestartAgent(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::SetFocus => {
                CommandPayload::SetFocus(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::NextActionable => CommandPayload::NextActionable,
            CommandType::ToggleMinimal => CommandPayload::ToggleMinimal,
            CommandType::SetPreference => {
                CommandPayload::SetPreference(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::HealthCheck => {
                CommandPayload::HealthCheck(serde_json::from_value(raw).map_err(map_err)?)
            }
            CommandType::Shutdown => CommandPayload::Shutdown,
        })
    }

    fn to_raw(&self) -> serde_json::Value {
        match self {
            CommandPayload::CreateSession(p) => serde_json::to_value(p),
            CommandPayload::DeleteSession(p) => serde_json::to_value(p),
            CommandPayload::UpdateSession(p) => serde_json::to_value(p),
            CommandPayload::ListSessions(p) => serde_json::to_value(p),
            CommandPayload::StartAgent(p)
            | CommandPayload::StopAgent(p)
            | CommandPayload::RestartAgent(p)
            | CommandPayload::SetFocus(p) => serde_json::to_value(p),
            CommandPayload::SetPreference(p) => serde_json::to_value(p),
            CommandPayload::HealthCheck(p) => serde_json::to_value(p),
            CommandPayload::NextActionable
            | CommandPayload::ToggleMinimal
            | CommandPayload::Shutdown => Ok(serde_json::json!({})),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

/// The single inbound envelope the worker pool dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: String,
    pub command_type: CommandType,
    pub timestamp: u64,
    pub payload: CommandPayload,
}

impl Command {
    pub fn new(id: impl Into<String>, timestamp: u64, payload: CommandPayload) -> Self {
        let command_type = match &payload {
            CommandPayload::CreateSession(_) => CommandType::CreateSession,
            CommandPayload::DeleteSession(_) => CommandType::DeleteSession,
            CommandPayload::UpdateSession(_) => CommandType::UpdateSession,
            CommandPayload::ListSessions(_) => CommandType::ListSessions,
            CommandPayload::StartAgent(_) => CommandType::StartAgent,
            CommandPayload::StopAgent(_) => CommandType::StopAgent,
            CommandPayload::RestartAgent(_) => CommandType::RestartAgent,
            CommandPayload::SetFocus(_) => CommandType::SetFocus,
            CommandPayload::NextActionable => CommandType::NextActionable,
            CommandPayload::ToggleMinimal => CommandType::ToggleMinimal,
            CommandPayload::SetPreference(_) => CommandType::SetPreference,
            CommandPayload::HealthCheck(_) => CommandType::HealthCheck,
            CommandPayload::Shutdown => CommandType::Shutdown,
        };
        Command {
            id: id.into(),
            command_type,
            timestamp,
            payload,
        }
    }
}

#[derive(Deserialize)]
struct RawCommand {
    id: String,
    #[serde(rename = "type")]
    command_type: CommandType,
    timestamp: u64,
    #[serde(default)]
    payload: serde_json::Value,
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawCommand::deserialize(deserializer)?;
        let payload = CommandPayload::from_raw(raw.command_type, raw.payload)
            .map_err(D::Error::custom)?;
        Ok(Command {
            id: raw.id,
            command_type: raw.command_type,
            timestamp: raw.timestamp,
            payload,
        })
    }
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Command", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.command_type)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("payload", &self.payload.to_raw())?;
        state.end()
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
