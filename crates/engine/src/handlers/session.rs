// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `create_session`, `delete_session`, `update_session`, `list_sessions`.

use trails_core::{
    generate_ulid, Clock, CreateContainerRequest, CreateSessionPayload, DeleteSessionPayload,
    EngineError, EnhancedEvent, EventBuilder, EventPayload, EventType, ListSessionsPayload,
    Session, SessionId, SessionStatus, UpdateSessionPayload,
};

use super::{HandlerContext, CONTAINER_CREATE_TIMEOUT};

fn build_event<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    event_type: EventType,
    payload: EventPayload,
) -> EnhancedEvent {
    let now = ctx.clock.now_ms();
    EventBuilder::new(event_type, payload)
        .command_id(command_id)
        .build(generate_ulid(now), now)
}

pub async fn create_session<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &CreateSessionPayload,
) -> Result<(), EngineError> {
    if ctx.registry.count() >= ctx.config.max_concurrent_sessions {
        return Err(EngineError::Capacity(format!(
            "max_concurrent_sessions ({}) reached",
            ctx.config.max_concurrent_sessions
        )));
    }

    let request = CreateContainerRequest {
        name: payload.name.clone(),
        source: payload.agent.clone(),
        environment: payload.environment.clone(),
    };

    let container = tokio::time::timeout(CONTAINER_CREATE_TIMEOUT, ctx.collaborator.create(request))
        .await
        .map_err(|_| EngineError::Collaborator("container create timed out".to_string()))?
        .map_err(|e| EngineError::Collaborator(e.to_string()))?;

    let now = ctx.clock.now_rfc3339();
    let session = Session {
        id: SessionId::new(generate_ulid(ctx.clock.now_ms())),
        name: payload.name.clone(),
        agent: payload.agent.clone(),
        status: SessionStatus::Ready,
        environment_id: container.id.as_str().to_string(),
        branch: payload.branch.clone().unwrap_or_else(|| "main".to_string()),
        created_at: now.clone(),
        updated_at: now.clone(),
        last_activity: now,
        environment: payload.environment.clone(),
    };
    ctx.registry.insert(session.clone());

    let event = build_event(
        ctx,
        command_id,
        EventType::SessionCreated,
        EventPayload::SessionCreated { session },
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

pub async fn delete_session<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &DeleteSessionPayload,
) -> Result<(), EngineError> {
    let session = ctx
        .registry
        .get(&payload.session_id)
        .ok_or_else(|| EngineError::NotFound(format!("session not found: {}", payload.session_id)))?;

    if session.status == SessionStatus::Working && !payload.force {
        return Err(EngineError::Precondition(
            "session is working; delete requires force=true".to_string(),
        ));
    }

    if let Err(e) = ctx.collaborator.destroy(&session.environment_id).await {
        tracing::warn!(
            session_id = %payload.session_id,
            environment_id = %session.environment_id,
            error = %e,
            "container destroy failed during session delete; removing session anyway"
        );
    }

    ctx.registry.remove(&payload.session_id);

    let event = build_event(
        ctx,
        command_id,
        EventType::SessionDeleted,
        EventPayload::SessionDeleted {
            session_id: payload.session_id.clone(),
        },
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

pub async fn update_session<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &UpdateSessionPayload,
) -> Result<(), EngineError> {
    let clock = ctx.clock.clone();
    let session = ctx
        .registry
        .update(&payload.session_id, &payload.updates, move || clock.now_rfc3339())?;

    let event = build_event(
        ctx,
        command_id,
        EventType::SessionUpdated,
        EventPayload::SessionUpdated { session },
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

pub async fn list_sessions<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &ListSessionsPayload,
) -> Result<(), EngineError> {
    let sessions = ctx.registry.list(&payload.to_filter());
    let event = build_event(
        ctx,
        command_id,
        EventType::SessionList,
        EventPayload::SessionList { sessions },
    );
    ctx.emitter.emit(event).await;
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
