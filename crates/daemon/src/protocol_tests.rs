// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use trails_core::{EventBuilder, EventPayload, EventType};

use super::*;

#[tokio::test]
async fn read_commands_decodes_valid_lines_and_stops_at_eof() {
    let (mut writer_side, reader_side) = tokio::io::duplex(4096);
    let (tx, mut rx) = mpsc::channel(8);

    writer_side
        .write_all(b"{\"id\":\"cmd-1\",\"type\":\"toggle_minimal\",\"timestamp\":1,\"payload\":{}}\n")
        .await
        .expect("write");
    drop(writer_side);

    read_commands(reader_side, tx).await;

    let command = rx.recv().await.expect("one command decoded");
    assert_eq!(command.id, "cmd-1");
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn read_commands_skips_malformed_lines_without_stopping() {
    let (mut writer_side, reader_side) = tokio::io::duplex(4096);
    let (tx, mut rx) = mpsc::channel(8);

    writer_side
        .write_all(b"not json\n{\"id\":\"cmd-2\",\"type\":\"toggle_minimal\",\"timestamp\":1,\"payload\":{}}\n")
        .await
        .expect("write");
    drop(writer_side);

    read_commands(reader_side, tx).await;

    let command = rx.recv().await.expect("malformed line skipped, valid one decoded");
    assert_eq!(command.id, "cmd-2");
}

#[tokio::test]
async fn write_events_emits_one_json_line_per_event() {
    let (tx, rx) = mpsc::channel(8);
    let event = EventBuilder::new(EventType::SystemInfo, EventPayload::SystemInfo { message: "hi".to_string() })
        .build("evt-1", 1);
    tx.send(event).await.expect("send");
    drop(tx);

    let (mut reader_side, writer_side) = tokio::io::duplex(4096);
    write_events(writer_side, rx).await;

    let mut out = Vec::new();
    reader_side.read_to_end(&mut out).await.expect("read");

    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"evt-1\""));
    assert!(text.ends_with('\n'));
}
