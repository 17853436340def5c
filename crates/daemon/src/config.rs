// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level configuration: wraps the engine's own [`EngineConfig`] with
//! the handful of settings the hosting process needs that the engine
//! doesn't care about (where to log, where the local container sandbox
//! lives).

use std::path::PathBuf;

use trails_engine::EngineConfig;

const ENV_LOG_PATH: &str = "TRAILS_LOG_PATH";
const ENV_CONTAINER_ROOT: &str = "TRAILS_CONTAINER_ROOT";

#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub log_path: PathBuf,
    pub container_root: PathBuf,
}

impl Config {
    /// Loads [`EngineConfig::load`] plus the daemon's own env overrides,
    /// deriving `log_path`/`container_root` from the engine's state
    /// directory when not overridden.
    pub fn load() -> Self {
        let engine = EngineConfig::load();

        let log_path = std::env::var(ENV_LOG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| engine.state_dir.join("daemon.log"));
        let container_root = std::env::var(ENV_CONTAINER_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|_| engine.state_dir.join("containers"));

        Config {
            engine,
            log_path,
            container_root,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
