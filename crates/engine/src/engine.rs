// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The worker-pool dispatcher: the core of the core. Owns the command
//! workers, the event emitter's back-off send loop, and the three
//! background tasks, all unified under one [`CancellationToken`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use trails_adapters::ContainerCollaborator;
use trails_core::{
    generate_ulid, validate, Clock, Command, EngineError, EnhancedEvent, EventBuilder, EventPayload,
    EventType, SessionFilter, SessionStatus,
};
use trails_storage::{PersistedState, StatePersister};

use crate::config::EngineConfig;
use crate::handlers::{self, EngineState, HandlerContext};
use crate::metrics::MetricsSink;
use crate::rate_limiter::LruRateLimiter;
use crate::registry::SessionRegistry;

/// State-manager cadence (spec: "the 30 s / 60 s / 60 s cadence is a
/// contract" — these are not configurable).
const STATE_MANAGER_INTERVAL: Duration = Duration::from_secs(30);
const HEALTH_MONITOR_INTERVAL: Duration = Duration::from_secs(60);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

const RATE_LIMITER_MAX_AGE: Duration = Duration::from_secs(5 * 60);
const STALE_ERROR_SESSION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Destination for a finished event. Implemented by [`EventEmitter`]; a test
/// double can record events instead of sending them on a real channel.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: EnhancedEvent);
}

fn event_type_tag(event_type: EventType) -> String {
    serde_json::to_value(event_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Sends on the bounded event channel with exponential back-off (10 ms,
/// doubling, capped at 500 ms, 5 attempts), racing cancellation at every
/// wait. Exhausting the retries drops the event and records
/// `events.dropped{type=...}`.
pub struct EventEmitter {
    tx: mpsc::Sender<EnhancedEvent>,
    cancel: CancellationToken,
    metrics: Arc<MetricsSink>,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<EnhancedEvent>, cancel: CancellationToken, metrics: Arc<MetricsSink>) -> Self {
        EventEmitter { tx, cancel, metrics }
    }
}

#[async_trait]
impl EventSink for EventEmitter {
    async fn emit(&self, event: EnhancedEvent) {
        let tag = event_type_tag(event.event_type);
        let mut backoff = Duration::from_millis(10);
        let mut pending = event;

        for attempt in 0..5u32 {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Closed(_)) => {
                    tracing::error!(event_type = %tag, "event channel closed; dropping event");
                    self.metrics.increment_counter(&format!("events.dropped{{type={tag}}}"));
                    return;
                }
                Err(TrySendError::Full(returned)) => {
                    pending = returned;
                    if attempt + 1 == 5 {
                        break;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.cancel.cancelled() => {
                            tracing::warn!(event_type = %tag, "cancelled while backing off on a full event queue");
                            return;
                        }
                    }
                    backoff = (backoff * 2).min(Duration::from_millis(500));
                }
            }
        }

        tracing::error!(event_type = %tag, "event queue still full after retries; dropping event");
        self.metrics.increment_counter(&format!("events.dropped{{type={tag}}}"));
    }
}

/// Worker-pool dispatcher. `C` is the clock source, swapped for a
/// [`trails_core::FakeClock`] in tests so timestamps are deterministic.
pub struct Engine<C: Clock> {
    command_rx: Arc<AsyncMutex<mpsc::Receiver<Command>>>,
    command_buffer_size: usize,
    event_tx: mpsc::Sender<EnhancedEvent>,
    registry: Arc<SessionRegistry>,
    persister: Arc<StatePersister>,
    collaborator: Arc<dyn ContainerCollaborator>,
    metrics: Arc<MetricsSink>,
    rate_limiter: Arc<LruRateLimiter>,
    clock: C,
    config: EngineConfig,
    cancel: CancellationToken,
    engine_state: Arc<RwLock<EngineState>>,
    tasks: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock> Engine<C> {
    /// All collaborators are required; there is no nil-like default.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command_rx: mpsc::Receiver<Command>,
        event_tx: mpsc::Sender<EnhancedEvent>,
        registry: Arc<SessionRegistry>,
        persister: Arc<StatePersister>,
        collaborator: Arc<dyn ContainerCollaborator>,
        metrics: Arc<MetricsSink>,
        clock: C,
        config: EngineConfig,
    ) -> Result<Arc<Self>, EngineError> {
        config.validate().map_err(EngineError::Validation)?;

        let cancel = CancellationToken::new();
        let rate_limiter = Arc::new(LruRateLimiter::new(
            config.rate_limit_per_second,
            config.rate_limit_burst,
            config.rate_limiter_max_size,
        ));

        Ok(Arc::new(Engine {
            command_rx: Arc::new(AsyncMutex::new(command_rx)),
            command_buffer_size: config.command_buffer_size,
            event_tx,
            registry,
            persister,
            collaborator,
            metrics,
            rate_limiter,
            clock,
            config,
            cancel,
            engine_state: Arc::new(RwLock::new(EngineState::default())),
            tasks: AsyncMutex::new(Vec::new()),
        }))
    }

    fn handler_context(&self) -> HandlerContext<C> {
        let emitter: Arc<dyn EventSink> = Arc::new(EventEmitter::new(
            self.event_tx.clone(),
            self.cancel.clone(),
            Arc::clone(&self.metrics),
        ));

        let command_rx_for_depth = Arc::clone(&self.command_rx);
        let command_buffer_size = self.command_buffer_size;
        let event_tx_for_depth = self.event_tx.clone();
        let event_buffer_size = self.config.event_buffer_size;

        HandlerContext {
            registry: Arc::clone(&self.registry),
            collaborator: Arc::clone(&self.collaborator),
            persister: Arc::clone(&self.persister),
            metrics: Arc::clone(&self.metrics),
            clock: self.clock.clone(),
            config: self.config.clone(),
            engine_state: Arc::clone(&self.engine_state),
            emitter,
            cancel: self.cancel.clone(),
            command_queue_depth: Arc::new(move || {
                command_buffer_size.saturating_sub(
                    command_rx_for_depth
                        .try_lock()
                        .map(|rx| rx.capacity())
                        .unwrap_or(command_buffer_size),
                )
            }),
            event_queue_depth: Arc::new(move || {
                event_buffer_size.saturating_sub(event_tx_for_depth.capacity())
            }),
        }
    }

    /// Loads persisted state (advisory fields only), spawns the worker pool
    /// and background tasks, and emits an initial state snapshot.
    pub async fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        let persisted = self
            .persister
            .load()
            .map_err(|e| EngineError::Internal(format!("failed to load persisted state: {e}")))?;
        {
            let mut state = self.engine_state.write();
            state.focused_id = persisted.focused_id;
            state.minimal_mode = persisted.minimal_mode;
            state.preferences = persisted.preferences;
        }

        let mut tasks = Vec::with_capacity(self.config.worker_count + 3);
        for worker_id in 0..self.config.worker_count {
            let engine = Arc::clone(self);
            tasks.push(tokio::spawn(async move { engine.worker_loop(worker_id).await }));
        }

        {
            let engine = Arc::clone(self);
            tasks.push(tokio::spawn(async move { engine.state_manager_task().await }));
        }
        {
            let engine = Arc::clone(self);
            tasks.push(tokio::spawn(async move { engine.health_monitor_task().await }));
        }
        {
            let engine = Arc::clone(self);
            tasks.push(tokio::spawn(async move { engine.cleanup_task().await }));
        }

        *self.tasks.lock().await = tasks;

        self.emit_state_snapshot("engine-startup").await;
        Ok(())
    }

    /// Cancels every task, waits up to `shutdown_timeout`, then always
    /// attempts a final save. Returns an error if the timeout was exceeded;
    /// the save is attempted regardless.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.cancel.cancel();

        let handles = std::mem::take(&mut *self.tasks.lock().await);
        let join_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        let timed_out = tokio::time::timeout(self.config.shutdown_timeout, join_all)
            .await
            .is_err();

        let snapshot = self.build_snapshot();
        if let Err(e) = self.persister.save(&snapshot) {
            tracing::error!(error = %e, "final save during shutdown failed");
        }

        if timed_out {
            return Err(EngineError::Internal(
                "shutdown timed out waiting for tasks to finish".to_string(),
            ));
        }
        Ok(())
    }

    fn build_snapshot(&self) -> PersistedState {
        let sessions = self.registry.list(&SessionFilter::default());
        let state = self.engine_state.read();
        PersistedState::snapshot(
            sessions,
            state.focused_id.clone(),
            state.minimal_mode,
            state.preferences.clone(),
            self.clock.now_rfc3339(),
        )
    }

    async fn emit_event(&self, event: EnhancedEvent) {
        let emitter = EventEmitter::new(self.event_tx.clone(), self.cancel.clone(), Arc::clone(&self.metrics));
        emitter.emit(event).await;
    }

    async fn emit_state_snapshot(&self, source: &str) {
        let session_count = self.registry.count();
        let now = self.clock.now_ms();
        let event = EventBuilder::new(
            EventType::SystemStateSnapshot,
            EventPayload::SystemStateSnapshot {
                session_count,
                snapshot_at: self.clock.now_rfc3339(),
            },
        )
        .source(source)
        .build(generate_ulid(now), now);
        self.emit_event(event).await;
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        let ctx = self.handler_context();
        loop {
            let command = {
                let mut rx = self.command_rx.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    maybe_command = rx.recv() => maybe_command,
                }
            };
            let Some(command) = command else {
                break;
            };
            self.process_command(&ctx, command).await;
        }
        tracing::info!(worker_id, "worker loop exiting");
    }

    async fn process_command(&self, ctx: &HandlerContext<C>, command: Command) {
        let command_type = command.command_type.to_string();
        self.metrics.record_command(&command_type);
        let started = Instant::now();
        let command_id = command.id.clone();
        let session_id = command.payload.session_id().map(str::to_string);

        let span = tracing::info_span!(
            "command",
            command_id = %command_id,
            command_type = %command_type,
            session_id = session_id.as_deref().unwrap_or("")
        );

        let result: Result<(), EngineError> = async {
            validate(&command)?;
            if let Some(sid) = &session_id {
                if !self.rate_limiter.allow(sid) {
                    tracing::warn!(target: "security", session_id = %sid, command_type = %command_type, "rate limit denied command");
                    return Err(EngineError::RateLimited(sid.clone()));
                }
            }
            handlers::dispatch(ctx, &command_id, &command.payload).await
        }
        .instrument(span)
        .await;

        self.metrics.record_duration(&command_type, started.elapsed());

        if let Err(err) = result {
            self.metrics.record_error(&command_type);
            let now = self.clock.now_ms();
            let event = EventBuilder::new(
                EventType::SystemError,
                EventPayload::SystemError {
                    code: "CMD_ERROR".to_string(),
                    message: "Command processing failed".to_string(),
                    details: Some(err.details()),
                    recoverable: true,
                },
            )
            .command_id(command_id)
            .build(generate_ulid(now), now);
            ctx.emitter.emit(event).await;
        }
    }

    async fn state_manager_task(self: Arc<Self>) {
        let mut interval = tokio::time::interval(STATE_MANAGER_INTERVAL);
        interval.tick().await; // first tick is immediate; consume it
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let snapshot = self.build_snapshot();
                    if let Err(e) = self.persister.save(&snapshot) {
                        tracing::error!(error = %e, "periodic state save failed");
                        self.metrics.record_error("state_manager.save");
                    }
                    self.emit_state_snapshot("engine-state-manager").await;
                }
            }
        }
        tracing::info!("state-manager task exiting");
    }

    async fn health_monitor_task(self: Arc<Self>) {
        let mut interval = tokio::time::interval(HEALTH_MONITOR_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let active_sessions = self.registry.count();
                    let rate_limiters = self.rate_limiter.size();
                    self.metrics.set_current_sessions(active_sessions);

                    if active_sessions >= self.config.max_concurrent_sessions {
                        self.emit_warning("MAX_SESSIONS", "maximum concurrent sessions reached").await;
                    }
                    if rate_limiters > self.config.rate_limiter_warning_threshold {
                        self.emit_warning("HIGH_RATE_LIMITERS", "rate limiter tracked-session count is high").await;
                    }
                }
            }
        }
        tracing::info!("health-monitor task exiting");
    }

    async fn emit_warning(&self, code: &str, message: &str) {
        let now = self.clock.now_ms();
        let event = EventBuilder::new(
            EventType::SystemWarning,
            EventPayload::SystemWarning {
                code: code.to_string(),
                message: message.to_string(),
            },
        )
        .build(generate_ulid(now), now);
        self.emit_event(event).await;
    }

    async fn cleanup_task(self: Arc<Self>) {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => self.run_cleanup_cycle().await,
            }
        }
        tracing::info!("cleanup task exiting");
    }

    async fn run_cleanup_cycle(&self) {
        let evicted = self.rate_limiter.cleanup(RATE_LIMITER_MAX_AGE);
        if evicted > 0 {
            tracing::debug!(evicted, "rate limiter cleanup evicted stale entries");
        }

        let now_ms = self.clock.now_ms();
        let stale_cutoff_ms = now_ms.saturating_sub(STALE_ERROR_SESSION_AGE.as_millis() as u64);

        let sessions = self.registry.list(&SessionFilter {
            status: Some(vec![SessionStatus::Error]),
            agent: None,
            branch: None,
        });

        for session in sessions {
            let last_activity_ms = parse_rfc3339_ms(&session.last_activity).unwrap_or(now_ms);
            if last_activity_ms >= stale_cutoff_ms {
                continue;
            }

            if let Err(e) = self.collaborator.destroy(&session.environment_id).await {
                tracing::warn!(session_id = %session.id, error = %e, "container destroy failed during stale-session cleanup; removing session anyway");
            }
            self.registry.remove(session.id.as_str());

            let now = self.clock.now_ms();
            let event = EventBuilder::new(
                EventType::SessionDeleted,
                EventPayload::SessionDeleted {
                    session_id: session.id.as_str().to_string(),
                },
            )
            .source("engine-cleanup")
            .build(generate_ulid(now), now);
            self.emit_event(event).await;
        }

        if self.config.reap_unreferenced_containers {
            let live_ids: Vec<String> = self
                .registry
                .list(&SessionFilter::default())
                .into_iter()
                .map(|s| s.environment_id)
                .collect();
            match self.collaborator.reap_unreferenced(&live_ids).await {
                Ok(count) if count > 0 => tracing::info!(count, "reaped unreferenced containers"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "reap_unreferenced failed"),
            }
        }
    }
}

/// Parses the millisecond-precision RFC3339 timestamps this crate writes
/// (`trails_core::clock::Clock::now_rfc3339`'s exact format) back to epoch
/// milliseconds. Returns `None` for anything else rather than panicking.
fn parse_rfc3339_ms(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.len() < 24 {
        return None;
    }
    let year: i64 = s.get(0..4)?.parse().ok()?;
    let month: i64 = s.get(5..7)?.parse().ok()?;
    let day: i64 = s.get(8..10)?.parse().ok()?;
    let hour: i64 = s.get(11..13)?.parse().ok()?;
    let minute: i64 = s.get(14..16)?.parse().ok()?;
    let second: i64 = s.get(17..19)?.parse().ok()?;
    let millis: i64 = s.get(20..23)?.parse().ok()?;

    // Days-from-civil (Howard Hinnant), inverse of clock.rs's civil-from-days.
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    let secs = days * 86_400 + hour * 3600 + minute * 60 + second;
    let total_ms = secs * 1000 + millis;
    if total_ms < 0 {
        None
    } else {
        Some(total_ms as u64)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
