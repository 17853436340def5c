// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use trails_adapters::FakeContainerCollaborator;
use trails_core::{CreateSessionPayload, EngineError, EventPayload, EventType, SessionIdPayload, SessionStatus};

use super::super::test_support::{test_context, RecordingSink};
use super::*;

async fn seeded_session(ctx: &HandlerContext<trails_core::FakeClock>) -> String {
    let payload = CreateSessionPayload {
        name: "seed".to_string(),
        agent: "claude".to_string(),
        branch: None,
        environment: HashMap::new(),
    };
    super::super::session::create_session(ctx, "seed-cmd", &payload)
        .await
        .expect("seed create");
    ctx.registry.list(&Default::default())[0].id.as_str().to_string()
}

#[tokio::test]
async fn start_agent_transitions_ready_to_working() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), Arc::clone(&sink));
    let session_id = seeded_session(&ctx).await;

    let payload = SessionIdPayload { session_id: session_id.clone() };
    start_agent(&ctx, "cmd-1", &payload).await.expect("start succeeds");

    assert_eq!(ctx.registry.get(&session_id).unwrap().status, SessionStatus::Working);
    let events = sink.events();
    let changed = events
        .iter()
        .find(|e| e.event_type == EventType::StatusChanged)
        .expect("status changed event present");
    assert_eq!(changed.metadata.command_id.as_deref(), Some("cmd-1"));
    match &changed.payload {
        EventPayload::StatusChanged { old_status, new_status, .. } => {
            assert_eq!(*old_status, SessionStatus::Ready);
            assert_eq!(*new_status, SessionStatus::Working);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn start_agent_rejects_non_ready_session() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), Arc::clone(&sink));
    let session_id = seeded_session(&ctx).await;
    let clock = ctx.clock.clone();
    ctx.registry
        .set_status(&session_id, SessionStatus::Working, move || clock.now_rfc3339())
        .expect("set status");

    let payload = SessionIdPayload { session_id };
    let err = start_agent(&ctx, "cmd-1", &payload).await.unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
}

#[tokio::test]
async fn start_agent_missing_session_is_not_found() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), sink);
    let payload = SessionIdPayload { session_id: "missing".to_string() };
    let err = start_agent(&ctx, "cmd-1", &payload).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn stop_agent_transitions_to_ready_and_records_old_status() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), Arc::clone(&sink));
    let session_id = seeded_session(&ctx).await;
    let clock = ctx.clock.clone();
    ctx.registry
        .set_status(&session_id, SessionStatus::Working, move || clock.now_rfc3339())
        .expect("set status");

    let payload = SessionIdPayload { session_id: session_id.clone() };
    stop_agent(&ctx, "cmd-2", &payload).await.expect("stop succeeds");

    assert_eq!(ctx.registry.get(&session_id).unwrap().status, SessionStatus::Ready);
    let events = sink.events();
    match &events.last().expect("an event was emitted").payload {
        EventPayload::StatusChanged { old_status, new_status, .. } => {
            assert_eq!(*old_status, SessionStatus::Working);
            assert_eq!(*new_status, SessionStatus::Ready);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn restart_agent_always_emits_working_to_working() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), Arc::clone(&sink));
    let session_id = seeded_session(&ctx).await;

    let payload = SessionIdPayload { session_id: session_id.clone() };
    restart_agent(&ctx, "cmd-3", &payload).await.expect("restart succeeds");

    assert_eq!(ctx.registry.get(&session_id).unwrap().status, SessionStatus::Working);
    let events = sink.events();
    match &events.last().expect("an event was emitted").payload {
        EventPayload::StatusChanged { old_status, new_status, .. } => {
            assert_eq!(*old_status, SessionStatus::Working);
            assert_eq!(*new_status, SessionStatus::Working);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn restart_agent_missing_session_is_not_found() {
    let sink = Arc::new(RecordingSink::default());
    let (ctx, _dir) = test_context(Arc::new(FakeContainerCollaborator::new()), sink);
    let payload = SessionIdPayload { session_id: "missing".to_string() };
    let err = restart_agent(&ctx, "cmd-3", &payload).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
