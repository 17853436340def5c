// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the protocol and engine.
//!
//! Kinds: validation, rate-limit, not-found, precondition, collaborator,
//! capacity, internal. All of them surface to the event consumer as a
//! single `system.error` event; this enum exists so that internal callers
//! (tests, handlers) can still distinguish the kind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("rate limit exceeded for session {0}")]
    RateLimited(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// The `details` text placed on the `CMD_ERROR` event: every kind
    /// surfaces identically to the consumer.
    pub fn details(&self) -> String {
        self.to_string()
    }
}
