// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane handlers: `set_focus`, `next_actionable`, `toggle_minimal`,
//! `set_preference`, `health_check`, `shutdown`. None of these touch a
//! container or mutate a session's status.

use std::time::Duration;

use trails_core::{
    generate_ulid, Clock, EngineError, EventBuilder, EventPayload, EventType, HealthDetails,
    HealthCheckPayload, SessionFilter, SessionIdPayload, SessionStatus, SetPreferencePayload,
};

use super::HandlerContext;

/// Verifies the session exists; does not emit an event (UI-local focus).
pub async fn set_focus<C: Clock>(
    ctx: &HandlerContext<C>,
    payload: &SessionIdPayload,
) -> Result<(), EngineError> {
    if !ctx.registry.contains(&payload.session_id) {
        return Err(EngineError::NotFound(format!(
            "session not found: {}",
            payload.session_id
        )));
    }
    ctx.engine_state.write().focused_id = Some(payload.session_id.clone());
    Ok(())
}

pub async fn next_actionable<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
) -> Result<(), EngineError> {
    let sessions = ctx.registry.list(&SessionFilter::default());
    let message = sessions
        .into_iter()
        .find(|s| matches!(s.status, SessionStatus::Error | SessionStatus::Waiting))
        .map(|s| format!("Next actionable session: {} ({})", s.name, s.id))
        .unwrap_or_else(|| "No actionable sessions found".to_string());

    let now = ctx.clock.now_ms();
    let event = EventBuilder::new(EventType::SystemInfo, EventPayload::SystemInfo { message })
        .command_id(command_id)
        .build(generate_ulid(now), now);
    ctx.emitter.emit(event).await;
    Ok(())
}

/// UI-local toggle; no event at the engine level.
pub async fn toggle_minimal<C: Clock>(ctx: &HandlerContext<C>) -> Result<(), EngineError> {
    let mut state = ctx.engine_state.write();
    state.minimal_mode = !state.minimal_mode;
    Ok(())
}

/// Accepted and recorded in memory; durable persistence is not wired up
/// yet, so this only reaches the TODO-marked hook.
pub async fn set_preference<C: Clock>(
    ctx: &HandlerContext<C>,
    payload: &SetPreferencePayload,
) -> Result<(), EngineError> {
    ctx.engine_state
        .write()
        .preferences
        .insert(payload.key.clone(), payload.value.clone());
    ctx.persister.note_preference_hint(&payload.key, &payload.value);
    Ok(())
}

pub async fn health_check<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    _payload: &HealthCheckPayload,
) -> Result<(), EngineError> {
    let details = HealthDetails {
        worker_count: ctx.config.worker_count,
        active_sessions: ctx.registry.count(),
        command_queue_depth: (ctx.command_queue_depth)(),
        event_queue_depth: (ctx.event_queue_depth)(),
    };

    let now = ctx.clock.now_ms();
    let event = EventBuilder::new(
        EventType::SystemHealthStatus,
        EventPayload::SystemHealthStatus {
            healthy: true,
            details,
        },
    )
    .command_id(command_id)
    .build(generate_ulid(now), now);
    ctx.emitter.emit(event).await;
    Ok(())
}

/// Emits `system.info("Shutdown initiated")` immediately, then cancels the
/// engine context after a short delay so the event has a chance to reach
/// the consumer before commands stop draining.
pub async fn shutdown<C: Clock>(ctx: &HandlerContext<C>, command_id: &str) -> Result<(), EngineError> {
    let now = ctx.clock.now_ms();
    let event = EventBuilder::new(
        EventType::SystemInfo,
        EventPayload::SystemInfo {
            message: "Shutdown initiated".to_string(),
        },
    )
    .command_id(command_id)
    .build(generate_ulid(now), now);
    ctx.emitter.emit(event).await;

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
    });
    Ok(())
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
