// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::thread::sleep;

#[test]
fn first_call_for_a_session_is_allowed_within_burst() {
    let limiter = LruRateLimiter::new(1.0, 1.0, 10);
    assert!(limiter.allow("sess-a"));
}

#[test]
fn exceeding_burst_denies_further_calls() {
    let limiter = LruRateLimiter::new(0.001, 1.0, 10);
    assert!(limiter.allow("sess-a"));
    assert!(!limiter.allow("sess-a"));
}

#[test]
fn distinct_sessions_have_independent_buckets() {
    let limiter = LruRateLimiter::new(0.001, 1.0, 10);
    assert!(limiter.allow("sess-a"));
    assert!(limiter.allow("sess-b"));
}

#[test]
fn lru_eviction_drops_the_least_recently_used_entries_first() {
    let limiter = LruRateLimiter::new(100.0, 100.0, 3);
    limiter.allow("a");
    limiter.allow("b");
    limiter.allow("c");
    // touch "a" so "b" becomes the least recently used
    limiter.allow("a");
    limiter.allow("d"); // forces an eviction
    assert_eq!(limiter.size(), 3);

    // "b" should have been evicted; a fresh bucket means allow() succeeds
    // immediately again instead of reusing the already-spent one.
    let arena_has_b = limiter.arena.read().index.contains_key("b");
    assert!(!arena_has_b);
    assert!(limiter.arena.read().index.contains_key("a"));
    assert!(limiter.arena.read().index.contains_key("c"));
    assert!(limiter.arena.read().index.contains_key("d"));
}

#[test]
fn max_size_is_never_exceeded() {
    let limiter = LruRateLimiter::new(100.0, 100.0, 2);
    for i in 0..10 {
        limiter.allow(&format!("sess-{i}"));
        assert!(limiter.size() <= 2);
    }
}

#[test]
fn cleanup_removes_entries_older_than_max_age() {
    let limiter = LruRateLimiter::new(100.0, 100.0, 10);
    limiter.allow("old");
    sleep(Duration::from_millis(20));
    limiter.allow("new");

    let removed = limiter.cleanup(Duration::from_millis(10));
    assert_eq!(removed, 1);
    assert!(!limiter.arena.read().index.contains_key("old"));
    assert!(limiter.arena.read().index.contains_key("new"));
}

proptest::proptest! {
    /// However many distinct sessions get hammered, the tracked set never
    /// exceeds the configured bound.
    #[test]
    fn size_is_bounded_for_any_session_id_sequence(ids in proptest::collection::vec("[a-z]{1,8}", 0..200)) {
        let limiter = LruRateLimiter::new(50.0, 50.0, 5);
        for id in &ids {
            limiter.allow(id);
            proptest::prop_assert!(limiter.size() <= 5);
        }
    }

    /// A session that has never been seen always gets its full burst: the
    /// first call can never be denied regardless of the rate configured.
    #[test]
    fn first_call_for_a_fresh_session_is_always_allowed(
        id in "[a-z]{1,12}",
        rate in 0.01f64..100.0,
        burst in 1.0f64..100.0,
    ) {
        let limiter = LruRateLimiter::new(rate, burst, 100);
        proptest::prop_assert!(limiter.allow(&id));
    }
}
