// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The container collaborator boundary. The engine only ever calls through
//! [`ContainerCollaborator`]; concrete providers (local sandbox, mock,
//! remote) live below this trait and are swappable without touching the
//! engine crate.

use async_trait::async_trait;
use thiserror::Error;
use trails_core::{Container, CreateContainerRequest};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("container create failed: {0}")]
    CreateFailed(String),
    #[error("container destroy failed: {0}")]
    DestroyFailed(String),
}

/// Implementations must be safe to call concurrently: the engine calls
/// `create`/`destroy`/`get_status` from any worker, with no external
/// synchronization around the call site.
#[async_trait]
pub trait ContainerCollaborator: Send + Sync + 'static {
    async fn create(&self, req: CreateContainerRequest) -> Result<Container, CollaboratorError>;

    async fn destroy(&self, env_id: &str) -> Result<(), CollaboratorError>;

    async fn get_status(
        &self,
        env_id: &str,
    ) -> Result<trails_core::ContainerStatus, CollaboratorError>;

    /// Destroys every tracked container whose id is not in `live_env_ids`.
    /// Returns the count destroyed. Only called when the engine's cleanup
    /// task has the reap-unreferenced-containers flag enabled.
    async fn reap_unreferenced(&self, live_env_ids: &[String]) -> Result<usize, CollaboratorError>;
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
