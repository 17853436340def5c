// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup.
//!
//! Events are the wire protocol on stdout; log output must never share
//! that stream, so it goes to a rotating-free file writer the same way the
//! hosting daemon this crate is modeled on does it.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::DaemonError;

pub fn setup(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = config.log_path.file_name().ok_or(DaemonError::InvalidLogPath)?;
    let dir = config.log_path.parent().ok_or(DaemonError::InvalidLogPath)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
