// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;

use super::*;

/// Serialise tests that mutate process env vars to avoid races.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_all() {
    for key in [
        ENV_STATE_DIR,
        ENV_WORKER_COUNT,
        ENV_COMMAND_BUFFER_SIZE,
        ENV_EVENT_BUFFER_SIZE,
        ENV_SHUTDOWN_TIMEOUT_MS,
        ENV_RATE_LIMIT_PER_SECOND,
        ENV_RATE_LIMIT_BURST,
        ENV_RATE_LIMITER_MAX_SIZE,
        ENV_RATE_LIMITER_WARNING_THRESHOLD,
        ENV_MAX_CONCURRENT_SESSIONS,
        ENV_REAP_UNREFERENCED_CONTAINERS,
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn default_config_passes_validation() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn load_without_overrides_matches_defaults() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    let config = EngineConfig::load();
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.command_buffer_size, 100);
    assert_eq!(config.event_buffer_size, 5000);
    clear_all();
}

#[test]
fn load_applies_env_overrides() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    std::env::set_var(ENV_WORKER_COUNT, "8");
    std::env::set_var(ENV_SHUTDOWN_TIMEOUT_MS, "2500");
    std::env::set_var(ENV_REAP_UNREFERENCED_CONTAINERS, "true");

    let config = EngineConfig::load();
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.shutdown_timeout, Duration::from_millis(2500));
    assert!(config.reap_unreferenced_containers);
    clear_all();
}

#[test]
fn load_falls_back_to_default_on_unparseable_value() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    std::env::set_var(ENV_WORKER_COUNT, "not_a_number");
    let config = EngineConfig::load();
    assert_eq!(config.worker_count, 3);
    clear_all();
}

#[test]
fn validate_rejects_zero_worker_count() {
    let mut config = EngineConfig::default();
    config.worker_count = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_nonpositive_rate_limit() {
    let mut config = EngineConfig::default();
    config.rate_limit_per_second = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn state_dir_prefers_explicit_override() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    std::env::set_var(ENV_STATE_DIR, "/tmp/trails-explicit");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/trails-explicit"));
    clear_all();
}
