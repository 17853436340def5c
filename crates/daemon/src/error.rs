// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level startup errors, distinct from [`trails_core::EngineError`]:
//! these cover wiring concerns (log file setup) the engine itself never
//! touches.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log path has no parent directory")]
    InvalidLogPath,
}
