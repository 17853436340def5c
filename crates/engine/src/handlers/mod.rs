// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-command handlers. Each returns `Ok(())` having already emitted its
//! own success event (or, for UI-only commands, nothing); an `Err` tells
//! the dispatcher to build the single `CMD_ERROR` event on the caller's
//! behalf. Handlers never talk to the rate limiter or the command/event
//! queues directly — only to the collaborators in [`HandlerContext`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use trails_adapters::ContainerCollaborator;
use trails_core::{Clock, CommandPayload, EngineError};
use trails_storage::StatePersister;

use crate::config::EngineConfig;
use crate::engine::EventSink;
use crate::metrics::MetricsSink;
use crate::registry::SessionRegistry;

pub mod agent;
pub mod session;
pub mod system;

/// Container-create calls are bounded by this timeout (spec: 5 minutes).
pub(crate) const CONTAINER_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Engine-owned state mutated only through handlers: current UI focus,
/// minimal-mode flag, and accepted-but-not-yet-persisted preferences.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub focused_id: Option<String>,
    pub minimal_mode: bool,
    pub preferences: HashMap<String, String>,
}

/// Shared collaborators every handler needs. Cheap to clone: everything
/// inside is an `Arc`, a `Clock` (itself cheap per its own contract), or a
/// plain config value.
pub struct HandlerContext<C: Clock> {
    pub registry: Arc<SessionRegistry>,
    pub collaborator: Arc<dyn ContainerCollaborator>,
    pub persister: Arc<StatePersister>,
    pub metrics: Arc<MetricsSink>,
    pub clock: C,
    pub config: EngineConfig,
    pub engine_state: Arc<RwLock<EngineState>>,
    pub emitter: Arc<dyn EventSink>,
    pub cancel: CancellationToken,
    pub command_queue_depth: Arc<dyn Fn() -> usize + Send + Sync>,
    pub event_queue_depth: Arc<dyn Fn() -> usize + Send + Sync>,
}

impl<C: Clock> Clone for HandlerContext<C> {
    fn clone(&self) -> Self {
        HandlerContext {
            registry: Arc::clone(&self.registry),
            collaborator: Arc::clone(&self.collaborator),
            persister: Arc::clone(&self.persister),
            metrics: Arc::clone(&self.metrics),
            clock: self.clock.clone(),
            config: self.config.clone(),
            engine_state: Arc::clone(&self.engine_state),
            emitter: Arc::clone(&self.emitter),
            cancel: self.cancel.clone(),
            command_queue_depth: Arc::clone(&self.command_queue_depth),
            event_queue_depth: Arc::clone(&self.event_queue_depth),
        }
    }
}

/// Routes a validated, rate-limit-cleared command to its handler.
pub async fn dispatch<C: Clock>(
    ctx: &HandlerContext<C>,
    command_id: &str,
    payload: &CommandPayload,
) -> Result<(), EngineError> {
    match payload {
        CommandPayload::CreateSession(p) => session::create_session(ctx, command_id, p).await,
        CommandPayload::DeleteSession(p) => session::delete_session(ctx, command_id, p).await,
        CommandPayload::UpdateSession(p) => session::update_session(ctx, command_id, p).await,
        CommandPayload::ListSessions(p) => session::list_sessions(ctx, command_id, p).await,
        CommandPayload::StartAgent(p) => agent::start_agent(ctx, command_id, p).await,
        CommandPayload::StopAgent(p) => agent::stop_agent(ctx, command_id, p).await,
        CommandPayload::RestartAgent(p) => agent::restart_agent(ctx, command_id, p).await,
        CommandPayload::SetFocus(p) => system::set_focus(ctx, p).await,
        CommandPayload::NextActionable => system::next_actionable(ctx, command_id).await,
        CommandPayload::ToggleMinimal => system::toggle_minimal(ctx).await,
        CommandPayload::SetPreference(p) => system::set_preference(ctx, p).await,
        CommandPayload::HealthCheck(p) => system::health_check(ctx, command_id, p).await,
        CommandPayload::Shutdown => system::shutdown(ctx, command_id).await,
    }
}
