// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `trailsd` — wires the engine to stdin/stdout as newline-delimited JSON
//! command/event lines. A thin ambient harness, not the terminal UI: it
//! exists so the workspace is runnable and manually exercisable without a
//! front end sitting in front of it.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info};
use trails_adapters::LocalContainerCollaborator;
use trails_core::SystemClock;
use trails_daemon::{config::Config, logging, protocol};
use trails_engine::{Engine, MetricsSink, SessionRegistry};
use trails_storage::StatePersister;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("trailsd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("trailsd {}", env!("CARGO_PKG_VERSION"));
                println!("Engine hosting harness — reads commands from stdin, writes events to stdout.");
                println!();
                println!("USAGE:");
                println!("    trailsd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: trailsd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();
    let log_guard = logging::setup(&config)?;

    info!("starting trailsd");

    let (command_tx, command_rx) = mpsc::channel(config.engine.command_buffer_size);
    let (event_tx, event_rx) = mpsc::channel(config.engine.event_buffer_size);

    let persister = Arc::new(StatePersister::new(config.engine.state_dir.join("state.json")));
    let collaborator = Arc::new(LocalContainerCollaborator::new(
        config.container_root.clone(),
        SystemClock,
    ));

    let engine = Engine::new(
        command_rx,
        event_tx,
        Arc::new(SessionRegistry::new()),
        persister,
        collaborator,
        Arc::new(MetricsSink::new()),
        SystemClock,
        config.engine.clone(),
    )?;

    engine.start().await?;

    let stdin_task = tokio::spawn(protocol::read_commands(tokio::io::stdin(), command_tx));
    tokio::spawn(protocol::write_events(tokio::io::stdout(), event_rx));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = stdin_task => {
            if let Err(err) = result {
                error!(error = %err, "stdin reader task panicked");
            } else {
                info!("stdin closed, shutting down");
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    if let Err(err) = engine.stop().await {
        error!(error = %err, "error during shutdown");
    }
    info!("trailsd stopped");
    drop(log_guard);
    Ok(())
}
