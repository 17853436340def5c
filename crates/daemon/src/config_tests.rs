// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_all() {
    for key in [ENV_LOG_PATH, ENV_CONTAINER_ROOT, "TRAILS_STATE_DIR"] {
        std::env::remove_var(key);
    }
}

#[test]
fn load_derives_log_and_container_paths_from_state_dir() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    std::env::set_var("TRAILS_STATE_DIR", "/tmp/trails-daemon-test-state");
    let config = Config::load();
    assert_eq!(
        config.log_path,
        PathBuf::from("/tmp/trails-daemon-test-state/daemon.log")
    );
    assert_eq!(
        config.container_root,
        PathBuf::from("/tmp/trails-daemon-test-state/containers")
    );
    clear_all();
}

#[test]
fn load_applies_explicit_log_path_override() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_all();
    std::env::set_var(ENV_LOG_PATH, "/tmp/explicit-daemon.log");
    let config = Config::load();
    assert_eq!(config.log_path, PathBuf::from("/tmp/explicit-daemon.log"));
    clear_all();
}
