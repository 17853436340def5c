// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use trails_adapters::FakeContainerCollaborator;
use trails_core::{
    Command, CommandPayload, CreateSessionPayload, EngineError, EnhancedEvent, EventPayload,
    EventType, FakeClock, SessionIdPayload,
};
use trails_storage::StatePersister;

use super::*;
use crate::config::EngineConfig;
use crate::metrics::MetricsSink;
use crate::registry::SessionRegistry;

fn test_config() -> EngineConfig {
    EngineConfig {
        worker_count: 2,
        command_buffer_size: 16,
        event_buffer_size: 16,
        shutdown_timeout: Duration::from_secs(2),
        rate_limit_per_second: 5.0,
        rate_limit_burst: 2.0,
        rate_limiter_max_size: 100,
        rate_limiter_warning_threshold: 50,
        max_concurrent_sessions: 10,
        ..EngineConfig::default()
    }
}

struct Harness {
    engine: Arc<Engine<FakeClock>>,
    command_tx: mpsc::Sender<Command>,
    event_rx: mpsc::Receiver<EnhancedEvent>,
    _dir: tempfile::TempDir,
}

async fn harness(config: EngineConfig) -> Harness {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer_size);
    let dir = tempfile::tempdir().expect("tempdir");
    let persister = Arc::new(StatePersister::new(dir.path().join("state.json")));

    let engine = Engine::new(
        command_rx,
        event_tx,
        Arc::new(SessionRegistry::new()),
        persister,
        Arc::new(FakeContainerCollaborator::new()),
        Arc::new(MetricsSink::new()),
        FakeClock::default(),
        config,
    )
    .expect("engine config is valid");

    engine.start().await.expect("engine starts");

    Harness {
        engine,
        command_tx,
        event_rx,
        _dir: dir,
    }
}

async fn next_event(rx: &mut mpsc::Receiver<EnhancedEvent>) -> EnhancedEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event arrives within timeout")
        .expect("channel is open")
}

/// Skips the `system.state_snapshot` emitted by `start()` so tests can
/// assert on the event a specific command produced.
async fn next_non_snapshot_event(rx: &mut mpsc::Receiver<EnhancedEvent>) -> EnhancedEvent {
    loop {
        let event = next_event(rx).await;
        if event.event_type != EventType::SystemStateSnapshot {
            return event;
        }
    }
}

fn create_session_command(id: &str) -> Command {
    Command::new(
        id,
        1,
        CommandPayload::CreateSession(CreateSessionPayload {
            name: "test session".to_string(),
            agent: "claude".to_string(),
            branch: None,
            environment: HashMap::new(),
        }),
    )
}

#[tokio::test]
async fn accepted_command_produces_one_event_carrying_its_command_id() {
    let mut h = harness(test_config()).await;

    h.command_tx.send(create_session_command("cmd-abc")).await.expect("send");
    let event = next_non_snapshot_event(&mut h.event_rx).await;

    assert_eq!(event.event_type, EventType::SessionCreated);
    assert_eq!(event.metadata.command_id.as_deref(), Some("cmd-abc"));

    h.engine.stop().await.expect("stop succeeds");
}

#[tokio::test]
async fn invalid_command_produces_a_single_cmd_error_event() {
    let mut h = harness(test_config()).await;

    let bad = Command::new(
        "cmd-bad",
        1,
        CommandPayload::StartAgent(SessionIdPayload {
            session_id: "not-a-ulid".to_string(),
        }),
    );
    h.command_tx.send(bad).await.expect("send");
    let event = next_non_snapshot_event(&mut h.event_rx).await;

    assert_eq!(event.event_type, EventType::SystemError);
    assert_eq!(event.metadata.command_id.as_deref(), Some("cmd-bad"));
    match event.payload {
        EventPayload::SystemError { code, recoverable, .. } => {
            assert_eq!(code, "CMD_ERROR");
            assert!(recoverable);
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    h.engine.stop().await.expect("stop succeeds");
}

#[tokio::test]
async fn rate_limited_session_commands_surface_as_cmd_error() {
    let mut h = harness(test_config()).await;

    h.command_tx.send(create_session_command("cmd-1")).await.expect("send");
    let created = next_non_snapshot_event(&mut h.event_rx).await;
    let session_id = match created.payload {
        EventPayload::SessionCreated { session } => session.id.as_str().to_string(),
        other => panic!("unexpected payload: {other:?}"),
    };

    // burst is 2.0: the first couple of start/stop pairs may succeed, but
    // hammering the same session will eventually trip the limiter.
    let mut saw_rate_limited = false;
    for i in 0..10 {
        let cmd = Command::new(
            format!("cmd-start-{i}"),
            1,
            CommandPayload::StartAgent(SessionIdPayload {
                session_id: session_id.clone(),
            }),
        );
        h.command_tx.send(cmd).await.expect("send");
        let event = next_non_snapshot_event(&mut h.event_rx).await;
        if event.event_type == EventType::SystemError {
            if let EventPayload::SystemError { details, .. } = &event.payload {
                if details.as_deref().unwrap_or("").contains("rate limit") {
                    saw_rate_limited = true;
                    break;
                }
            }
        }
        // restore readiness so the next attempt isn't rejected by a
        // precondition failure instead of the rate limiter.
        let stop = Command::new(
            format!("cmd-stop-{i}"),
            1,
            CommandPayload::StopAgent(SessionIdPayload {
                session_id: session_id.clone(),
            }),
        );
        h.command_tx.send(stop).await.expect("send");
        let _ = next_non_snapshot_event(&mut h.event_rx).await;
    }

    assert!(saw_rate_limited, "expected at least one rate-limited command");
    h.engine.stop().await.expect("stop succeeds");
}

#[tokio::test]
async fn shutdown_command_emits_info_and_engine_stops_cleanly() {
    let mut h = harness(test_config()).await;

    let shutdown = Command::new("cmd-shutdown", 1, CommandPayload::Shutdown);
    h.command_tx.send(shutdown).await.expect("send");
    let event = next_non_snapshot_event(&mut h.event_rx).await;
    assert_eq!(event.event_type, EventType::SystemInfo);

    h.engine.stop().await.expect("stop succeeds without timing out");
}

#[tokio::test]
async fn engine_rejects_invalid_config() {
    let (_command_tx, command_rx) = mpsc::channel(1);
    let (event_tx, _event_rx) = mpsc::channel(1);
    let dir = tempfile::tempdir().expect("tempdir");
    let persister = Arc::new(StatePersister::new(dir.path().join("state.json")));

    let mut config = test_config();
    config.worker_count = 0;

    let err = Engine::new(
        command_rx,
        event_tx,
        Arc::new(SessionRegistry::new()),
        persister,
        Arc::new(FakeContainerCollaborator::new()),
        Arc::new(MetricsSink::new()),
        FakeClock::default(),
        config,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
