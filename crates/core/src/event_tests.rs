// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_correlation_id_to_new_event_id() {
    let event = EventBuilder::new(
        EventType::SystemInfo,
        EventPayload::SystemInfo {
            message: "started".into(),
        },
    )
    .build("evt-1", 1);
    assert_eq!(event.metadata.correlation_id, "evt-1");
}

#[test]
fn defaults_causation_id_to_command_id_when_present() {
    let event = EventBuilder::new(
        EventType::SessionDeleted,
        EventPayload::SessionDeleted {
            session_id: "sess-1".into(),
        },
    )
    .command_id("cmd-1")
    .build("evt-1", 1);
    assert_eq!(event.metadata.causation_id, "cmd-1");
    assert_eq!(event.metadata.command_id, Some("cmd-1".to_string()));
}

#[test]
fn defaults_causation_id_to_event_id_without_a_command() {
    let event = EventBuilder::new(
        EventType::SystemWarning,
        EventPayload::SystemWarning {
            code: "RATE_LIMIT".into(),
            message: "dropping event".into(),
        },
    )
    .build("evt-2", 1);
    assert_eq!(event.metadata.causation_id, "evt-2");
}

#[test]
fn explicit_correlation_and_causation_override_defaults() {
    let event = EventBuilder::new(
        EventType::SystemInfo,
        EventPayload::SystemInfo {
            message: "hi".into(),
        },
    )
    .command_id("cmd-1")
    .correlation_id("corr-1")
    .causation_id("cause-1")
    .build("evt-1", 1);
    assert_eq!(event.metadata.correlation_id, "corr-1");
    assert_eq!(event.metadata.causation_id, "cause-1");
}

#[test]
fn round_trips_through_json() {
    let event = EventBuilder::new(
        EventType::StatusChanged,
        EventPayload::StatusChanged {
            session_id: "sess-1".into(),
            old_status: crate::session::SessionStatus::Ready,
            new_status: crate::session::SessionStatus::Working,
            reason: Some("agent started".into()),
        },
    )
    .session_id("sess-1")
    .build("evt-1", 42);

    let encoded = serde_json::to_string(&event).expect("serialize");
    let decoded: EnhancedEvent = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(event, decoded);
}

#[test]
fn distinct_variants_with_identical_shapes_do_not_collide() {
    let created = EventPayload::SessionCreated {
        session: sample_session(),
    };
    let updated = EventPayload::SessionUpdated {
        session: sample_session(),
    };
    let created_json = serde_json::to_value(&created).expect("serialize");
    let updated_json = serde_json::to_value(&updated).expect("serialize");
    assert_ne!(created_json, updated_json);

    let decoded: EventPayload = serde_json::from_value(updated_json).expect("deserialize");
    assert_eq!(decoded, updated);
}

fn sample_session() -> Session {
    Session {
        id: crate::id::SessionId::new("01HQJW5X7CT4HN3X5V4DKREZJ8"),
        name: "sess-a".into(),
        agent: "claude".into(),
        status: crate::session::SessionStatus::Ready,
        environment_id: "env-1".into(),
        branch: "main".into(),
        created_at: "2026-01-01T00:00:00.000Z".into(),
        updated_at: "2026-01-01T00:00:00.000Z".into(),
        last_activity: "2026-01-01T00:00:00.000Z".into(),
        environment: Default::default(),
    }
}
