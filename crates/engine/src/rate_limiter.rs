// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session token bucket, bounded by an LRU of tracked sessions.
//!
//! The tracked set is a fixed-capacity arena addressed by index, linked
//! into a doubly-linked list for O(1) move-to-MRU and O(1) pop-LRU, plus a
//! `HashMap<String, usize>` for O(1) lookup by session id. No unsafe code:
//! the list is expressed through `Option<usize>` links into the arena
//! rather than pointers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    rate_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rate_per_sec: f64, burst: f64, now: Instant) -> Self {
        TokenBucket {
            capacity: burst,
            tokens: burst,
            rate_per_sec,
            last_refill: now,
        }
    }

    fn allow(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

struct Node {
    key: String,
    bucket: TokenBucket,
    last_access: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Arena {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>, // least recently used
    tail: Option<usize>, // most recently used
}

impl Arena {
    fn new() -> Self {
        Arena {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("unlink of missing node");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().expect("prev node").next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().expect("next node").prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let node = self.nodes[idx].as_mut().expect("push_back of missing node");
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => self.nodes[t].as_mut().expect("old tail").next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Moves an existing entry to the MRU end and returns its index.
    fn touch(&mut self, idx: usize) {
        self.unlink(idx);
        self.push_back(idx);
    }

    fn insert_new(&mut self, key: String, bucket: TokenBucket, now: Instant) -> usize {
        let node = Node {
            key: key.clone(),
            bucket,
            last_access: now,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_back(idx);
        idx
    }

    fn evict_lru(&mut self) -> Option<String> {
        let idx = self.head?;
        self.unlink(idx);
        let node = self.nodes[idx].take().expect("evicted node");
        self.index.remove(&node.key);
        self.free.push(idx);
        Some(node.key)
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(idx) = self.index.remove(key) else {
            return false;
        };
        self.unlink(idx);
        self.nodes[idx] = None;
        self.free.push(idx);
        true
    }
}

pub struct LruRateLimiter {
    arena: RwLock<Arena>,
    max_size: usize,
    rate_per_sec: f64,
    burst: f64,
}

impl LruRateLimiter {
    pub fn new(rate_per_sec: f64, burst: f64, max_size: usize) -> Self {
        LruRateLimiter {
            arena: RwLock::new(Arena::new()),
            max_size,
            rate_per_sec,
            burst,
        }
    }

    /// `allow` takes the write lock: every call either refills an existing
    /// bucket or, on a new session, may evict the LRU head under pressure.
    pub fn allow(&self, session_id: &str) -> bool {
        let now = Instant::now();
        let mut arena = self.arena.write();

        if let Some(&idx) = arena.index.get(session_id) {
            arena.touch(idx);
            let node = arena.nodes[idx].as_mut().expect("touched node");
            node.last_access = now;
            return node.bucket.allow(now);
        }

        if arena.len() >= self.max_size {
            arena.evict_lru();
        }

        let bucket = TokenBucket::new(self.rate_per_sec, self.burst, now);
        let idx = arena.insert_new(session_id.to_string(), bucket, now);
        let node = arena.nodes[idx].as_mut().expect("freshly inserted node");
        node.bucket.allow(now)
    }

    /// `size` takes only the read lock.
    pub fn size(&self) -> usize {
        self.arena.read().len()
    }

    /// Age-based reclamation: removes entries whose `last_access` is older
    /// than `max_age`. Returns the count removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut arena = self.arena.write();
        let stale: Vec<String> = arena
            .nodes
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|node| now.saturating_duration_since(node.last_access) > max_age)
            .map(|node| node.key.clone())
            .collect();
        for key in &stale {
            arena.remove(key);
        }
        stale.len()
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
