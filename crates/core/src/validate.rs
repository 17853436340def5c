// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pure, panic-free validation for command envelopes.
//!
//! Character-class checks go through 256-entry lookup tables instead of
//! per-character match arms or regex, so validation stays fast under the
//! worker pool's hot path.

use crate::command::{Command, CommandPayload};
use crate::error::EngineError;
use crate::ulid::is_valid_ulid;

const MAX_NAME_LEN: usize = 50;
const MAX_ENV_KEY_LEN: usize = 100;
const MAX_ENV_VALUE_LEN: usize = 1000;

/// Agents the engine is willing to spawn a container for. Matches the
/// drivers this lineage ships: claude, gemini.
pub const KNOWN_AGENTS: &[&str] = &["claude", "gemini"];

const fn build_name_char_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut b = 0usize;
    while b < 256 {
        let c = b as u8;
        let allowed = c.is_ascii_alphanumeric() || c == b' ' || c == b'_' || c == b'-';
        table[b] = allowed;
        b += 1;
    }
    table
}

static NAME_CHAR_TABLE: [bool; 256] = build_name_char_table();

/// `[A-Za-z0-9 _-]+`, checked one lookup per byte.
fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.bytes().all(|b| NAME_CHAR_TABLE[b as usize])
}

fn validate_environment(
    env: &std::collections::HashMap<String, String>,
) -> Result<(), EngineError> {
    for (k, v) in env {
        if k.len() > MAX_ENV_KEY_LEN {
            return Err(EngineError::Validation(format!(
                "environment key '{k}' exceeds {MAX_ENV_KEY_LEN} characters"
            )));
        }
        if v.len() > MAX_ENV_VALUE_LEN {
            return Err(EngineError::Validation(format!(
                "environment value for '{k}' exceeds {MAX_ENV_VALUE_LEN} characters"
            )));
        }
    }
    Ok(())
}

fn validate_session_id_field(field: &str, value: &str) -> Result<(), EngineError> {
    if !is_valid_ulid(value) {
        return Err(EngineError::Validation(format!(
            "{field} is not a well-formed ULID: '{value}'"
        )));
    }
    Ok(())
}

/// Validates a fully-decoded command. Never panics: unknown payload shapes
/// are caught earlier by the two-phase decode in `command.rs` and surface
/// here as a `Validation` error rather than propagating a parser panic.
pub fn validate(command: &Command) -> Result<(), EngineError> {
    if command.id.is_empty() {
        return Err(EngineError::Validation("command id must not be empty".into()));
    }
    if command.timestamp == 0 {
        return Err(EngineError::Validation(
            "command timestamp must not be zero".into(),
        ));
    }
    if !command.payload.matches_type(command.command_type) {
        return Err(EngineError::Validation(format!(
            "payload does not match declared command type {:?}",
            command.command_type
        )));
    }

    match &command.payload {
        CommandPayload::CreateSession(p) => {
            if !is_valid_session_name(&p.name) {
                return Err(EngineError::Validation(format!(
                    "session name '{}' must be 1-{MAX_NAME_LEN} chars of [A-Za-z0-9 _-]",
                    p.name
                )));
            }
            if !KNOWN_AGENTS.contains(&p.agent.as_str()) {
                return Err(EngineError::Validation(format!(
                    "unsupported agent '{}'",
                    p.agent
                )));
            }
            validate_environment(&p.environment)?;
        }
        CommandPayload::DeleteSession(p) => {
            validate_session_id_field("session_id", &p.session_id)?;
        }
        CommandPayload::UpdateSession(p) => {
            validate_session_id_field("session_id", &p.session_id)?;
            if let Some(name) = &p.updates.name {
                if !is_valid_session_name(name) {
                    return Err(EngineError::Validation(format!(
                        "session name '{name}' must be 1-{MAX_NAME_LEN} chars of [A-Za-z0-9 _-]"
                    )));
                }
            }
            if let Some(env) = &p.updates.environment {
                validate_environment(env)?;
            }
        }
        CommandPayload::ListSessions(_) => {}
        CommandPayload::StartAgent(p)
        | CommandPayload::StopAgent(p)
        | CommandPayload::RestartAgent(p)
        | CommandPayload::SetFocus(p) => {
            validate_session_id_field("session_id", &p.session_id)?;
        }
        CommandPayload::NextActionable => {}
        CommandPayload::ToggleMinimal => {}
        CommandPayload::SetPreference(_) => {}
        CommandPayload::HealthCheck(_) => {}
        CommandPayload::Shutdown => {}
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
