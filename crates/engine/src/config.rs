// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration: explicit fields, no hidden globals. Resolved from
//! environment variables with documented defaults, the way the daemon's
//! own `env.rs`/`lifecycle::Config::load()` resolve the state directory.

use std::path::PathBuf;
use std::time::Duration;

/// Env var overrides, all optional; unset falls back to the listed default.
const ENV_STATE_DIR: &str = "TRAILS_STATE_DIR";
const ENV_WORKER_COUNT: &str = "TRAILS_WORKER_COUNT";
const ENV_COMMAND_BUFFER_SIZE: &str = "TRAILS_COMMAND_BUFFER_SIZE";
const ENV_EVENT_BUFFER_SIZE: &str = "TRAILS_EVENT_BUFFER_SIZE";
const ENV_SHUTDOWN_TIMEOUT_MS: &str = "TRAILS_SHUTDOWN_TIMEOUT_MS";
const ENV_RATE_LIMIT_PER_SECOND: &str = "TRAILS_RATE_LIMIT_PER_SECOND";
const ENV_RATE_LIMIT_BURST: &str = "TRAILS_RATE_LIMIT_BURST";
const ENV_RATE_LIMITER_MAX_SIZE: &str = "TRAILS_RATE_LIMITER_MAX_SIZE";
const ENV_RATE_LIMITER_WARNING_THRESHOLD: &str = "TRAILS_RATE_LIMITER_WARNING_THRESHOLD";
const ENV_MAX_CONCURRENT_SESSIONS: &str = "TRAILS_MAX_CONCURRENT_SESSIONS";
const ENV_REAP_UNREFERENCED_CONTAINERS: &str = "TRAILS_REAP_UNREFERENCED_CONTAINERS";

/// Resolve the state directory: `TRAILS_STATE_DIR` > `XDG_STATE_HOME/trails`
/// > `~/.local/state/trails`.
pub fn state_dir() -> Result<PathBuf, std::env::VarError> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("trails"));
    }
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".local/state/trails"))
}

/// Tunables for [`crate::Engine`]. Every field here is validated once in
/// `Engine::new`; nothing is read from the environment after startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub state_dir: PathBuf,
    pub worker_count: usize,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub rate_limit_per_second: f64,
    pub rate_limit_burst: f64,
    pub rate_limiter_max_size: usize,
    pub rate_limiter_warning_threshold: usize,
    pub max_concurrent_sessions: usize,
    pub reap_unreferenced_containers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            state_dir: PathBuf::from(".trails-state"),
            worker_count: 3,
            command_buffer_size: 100,
            event_buffer_size: 5000,
            shutdown_timeout: Duration::from_secs(10),
            rate_limit_per_second: 5.0,
            rate_limit_burst: 10.0,
            rate_limiter_max_size: 10_000,
            rate_limiter_warning_threshold: 1_000,
            max_concurrent_sessions: 50,
            reap_unreferenced_containers: false,
        }
    }
}

impl EngineConfig {
    /// Loads defaults, then applies any of the `TRAILS_*` overrides present
    /// in the environment. Unparseable values fall back to the default
    /// rather than failing startup.
    pub fn load() -> Self {
        let mut config = EngineConfig {
            state_dir: state_dir().unwrap_or_else(|_| PathBuf::from(".trails-state")),
            ..EngineConfig::default()
        };

        if let Some(v) = parse_env(ENV_WORKER_COUNT) {
            config.worker_count = v;
        }
        if let Some(v) = parse_env(ENV_COMMAND_BUFFER_SIZE) {
            config.command_buffer_size = v;
        }
        if let Some(v) = parse_env(ENV_EVENT_BUFFER_SIZE) {
            config.event_buffer_size = v;
        }
        if let Some(ms) = parse_env::<u64>(ENV_SHUTDOWN_TIMEOUT_MS) {
            config.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse_env(ENV_RATE_LIMIT_PER_SECOND) {
            config.rate_limit_per_second = v;
        }
        if let Some(v) = parse_env(ENV_RATE_LIMIT_BURST) {
            config.rate_limit_burst = v;
        }
        if let Some(v) = parse_env(ENV_RATE_LIMITER_MAX_SIZE) {
            config.rate_limiter_max_size = v;
        }
        if let Some(v) = parse_env(ENV_RATE_LIMITER_WARNING_THRESHOLD) {
            config.rate_limiter_warning_threshold = v;
        }
        if let Some(v) = parse_env(ENV_MAX_CONCURRENT_SESSIONS) {
            config.max_concurrent_sessions = v;
        }
        if let Some(v) = parse_env(ENV_REAP_UNREFERENCED_CONTAINERS) {
            config.reap_unreferenced_containers = v;
        }

        config
    }

    /// Rejects nonsensical tunables up front so construction fails loudly
    /// instead of degrading silently at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be at least 1".to_string());
        }
        if self.command_buffer_size == 0 {
            return Err("command_buffer_size must be at least 1".to_string());
        }
        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be at least 1".to_string());
        }
        if self.rate_limit_per_second <= 0.0 {
            return Err("rate_limit_per_second must be positive".to_string());
        }
        if self.rate_limit_burst <= 0.0 {
            return Err("rate_limit_burst must be positive".to_string());
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
