// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON wire codec: one [`Command`] per line on stdin,
//! one [`EnhancedEvent`] per line on stdout.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use trails_core::{Command, EnhancedEvent};

/// Reads commands from `reader` line by line until EOF, forwarding each
/// successfully-decoded one to `tx`. A line that fails to parse is logged
/// and skipped rather than killing the reader — one malformed line from a
/// hosting process should not take down the whole session.
pub async fn read_commands<R>(reader: R, tx: mpsc::Sender<Command>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Command>(line) {
                    Ok(command) => {
                        if tx.send(command).await.is_err() {
                            tracing::warn!("command channel closed, stopping stdin reader");
                            return;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "discarding malformed command line");
                    }
                }
            }
            Ok(None) => {
                tracing::info!("stdin closed, stopping command reader");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "error reading stdin, stopping command reader");
                return;
            }
        }
    }
}

/// Drains `rx` and writes each event as one JSON line to `writer`, flushing
/// after every line so a consumer reading line-by-line never blocks on a
/// buffered partial write.
pub async fn write_events<W>(mut writer: W, mut rx: mpsc::Receiver<EnhancedEvent>)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode event, dropping");
                continue;
            }
        };
        if writer.write_all(line.as_bytes()).await.is_err() {
            tracing::warn!("stdout closed, stopping event writer");
            return;
        }
        if writer.write_all(b"\n").await.is_err() {
            return;
        }
        if writer.flush().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
