// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `start_agent`, `stop_agent`, `restart_agent`: status transitions for an
//! existing session's agent process.

use trails_core::{
    generate_ulid, Clock, EngineError, EventBuilder, EventPayload, EventType, SessionIdPayload,
    SessionStatus,
};

use super::HandlerContext;

fn status_changed_event<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    session_id: &str,
    old_status: SessionStatus,
    new_status: SessionStatus,
    reason: Option<String>,
) -> trails_core::EnhancedEvent {
    let now = ctx.clock.now_ms();
    EventBuilder::new(
        EventType::StatusChanged,
        EventPayload::StatusChanged {
            session_id: session_id.to_string(),
            old_status,
            new_status,
            reason,
        },
    )
    .command_id(command_id)
    .session_id(session_id)
    .build(generate_ulid(now), now)
}

pub async fn start_agent<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &SessionIdPayload,
) -> Result<(), EngineError> {
    let session = ctx
        .registry
        .get(&payload.session_id)
        .ok_or_else(|| EngineError::NotFound(format!("session not found: {}", payload.session_id)))?;

    if session.status != SessionStatus::Ready {
        return Err(EngineError::Precondition(format!(
            "session {} is {:?}, not ready",
            payload.session_id, session.status
        )));
    }

    let clock = ctx.clock.clone();
    ctx.registry
        .set_status(&payload.session_id, SessionStatus::Working, move || clock.now_rfc3339())?;

    let event = status_changed_event(
        ctx,
        command_id,
        &payload.session_id,
        SessionStatus::Ready,
        SessionStatus::Working,
        Some("Agent started".to_string()),
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

pub async fn stop_agent<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &SessionIdPayload,
) -> Result<(), EngineError> {
    let session = ctx
        .registry
        .get(&payload.session_id)
        .ok_or_else(|| EngineError::NotFound(format!("session not found: {}", payload.session_id)))?;
    let old_status = session.status;

    let clock = ctx.clock.clone();
    ctx.registry
        .set_status(&payload.session_id, SessionStatus::Ready, move || clock.now_rfc3339())?;

    let event = status_changed_event(
        ctx,
        command_id,
        &payload.session_id,
        old_status,
        SessionStatus::Ready,
        Some("Agent stopped".to_string()),
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

/// No-op restart: preserves the `working→working` event shape without
/// touching the underlying container or process. The event is emitted
/// regardless of the session's actual status beforehand, matching the
/// literal shape demanded for this command.
pub async fn restart_agent<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &SessionIdPayload,
) -> Result<(), EngineError> {
    ctx.registry
        .get(&payload.session_id)
        .ok_or_else(|| EngineError::NotFound(format!("session not found: {}", payload.session_id)))?;

    let clock = ctx.clock.clone();
    ctx.registry
        .set_status(&payload.session_id, SessionStatus::Working, move || clock.now_rfc3339())?;

    let event = status_changed_event(
        ctx,
        command_id,
        &payload.session_id,
        SessionStatus::Working,
        SessionStatus::Working,
        Some("Agent restarted".to_string()),
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
