// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory container collaborator for deterministic engine tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use trails_core::{Container, ContainerStatus, CreateContainerRequest, EnvironmentId};

use crate::container::{CollaboratorError, ContainerCollaborator};

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerCall {
    Create { name: String },
    Destroy { env_id: String },
    GetStatus { env_id: String },
}

struct FakeState {
    containers: HashMap<String, Container>,
    calls: Vec<ContainerCall>,
    next_id: u64,
    fail_create: bool,
    fail_destroy: bool,
}

/// Records every call for assertion and can be told to fail `create` or
/// `destroy` on demand, the way [`crate::session`]-equivalent fakes in this
/// lineage record calls for test inspection.
#[derive(Clone)]
pub struct FakeContainerCollaborator {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeContainerCollaborator {
    fn default() -> Self {
        FakeContainerCollaborator {
            inner: Arc::new(Mutex::new(FakeState {
                containers: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                fail_create: false,
                fail_destroy: false,
            })),
        }
    }
}

impl FakeContainerCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ContainerCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.inner.lock().fail_create = fail;
    }

    pub fn set_fail_destroy(&self, fail: bool) {
        self.inner.lock().fail_destroy = fail;
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        self.inner.lock().containers.keys().cloned().collect()
    }
}

#[async_trait]
impl ContainerCollaborator for FakeContainerCollaborator {
    async fn create(&self, req: CreateContainerRequest) -> Result<Container, CollaboratorError> {
        let mut state = self.inner.lock();
        state.calls.push(ContainerCall::Create {
            name: req.name.clone(),
        });
        if state.fail_create {
            return Err(CollaboratorError::CreateFailed("forced failure".into()));
        }
        state.next_id += 1;
        let id = format!("fake-env-{}", state.next_id);
        let container = Container {
            id: EnvironmentId::new(id.clone()),
            name: req.name,
            status: ContainerStatus::Ready,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            metadata: req.environment,
        };
        state.containers.insert(id, container.clone());
        Ok(container)
    }

    async fn destroy(&self, env_id: &str) -> Result<(), CollaboratorError> {
        let mut state = self.inner.lock();
        state.calls.push(ContainerCall::Destroy {
            env_id: env_id.to_string(),
        });
        if state.fail_destroy {
            return Err(CollaboratorError::DestroyFailed("forced failure".into()));
        }
        state
            .containers
            .remove(env_id)
            .map(|_| ())
            .ok_or_else(|| CollaboratorError::NotFound(env_id.to_string()))
    }

    async fn get_status(&self, env_id: &str) -> Result<ContainerStatus, CollaboratorError> {
        let mut state = self.inner.lock();
        state.calls.push(ContainerCall::GetStatus {
            env_id: env_id.to_string(),
        });
        state
            .containers
            .get(env_id)
            .map(|c| c.status)
            .ok_or_else(|| CollaboratorError::NotFound(env_id.to_string()))
    }

    async fn reap_unreferenced(&self, live_env_ids: &[String]) -> Result<usize, CollaboratorError> {
        let stale: Vec<String> = {
            let state = self.inner.lock();
            state
                .containers
                .keys()
                .filter(|id| !live_env_ids.iter().any(|live| live == *id))
                .cloned()
                .collect()
        };
        for id in &stale {
            self.destroy(id).await?;
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
