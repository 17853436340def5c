// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A local, filesystem-backed sandbox: each environment gets a scratch
//! directory under a root the caller chooses. No real container runtime —
//! this is the provider the ambient hosting binary wires up by default so
//! the workspace is runnable without a daemon-side container service.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use trails_core::{Clock, Container, ContainerStatus, CreateContainerRequest, EnvironmentId};

use crate::container::{CollaboratorError, ContainerCollaborator};

struct Entry {
    container: Container,
    dir: PathBuf,
}

pub struct LocalContainerCollaborator<C: Clock> {
    root: PathBuf,
    clock: C,
    containers: Arc<Mutex<HashMap<String, Entry>>>,
    next_id: Arc<Mutex<u64>>,
}

impl<C: Clock> LocalContainerCollaborator<C> {
    pub fn new(root: impl Into<PathBuf>, clock: C) -> Self {
        LocalContainerCollaborator {
            root: root.into(),
            clock,
            containers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    fn allocate_id(&self) -> String {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        format!("env-{}", *next_id)
    }
}

#[async_trait]
impl<C: Clock> ContainerCollaborator for LocalContainerCollaborator<C> {
    async fn create(&self, req: CreateContainerRequest) -> Result<Container, CollaboratorError> {
        let id = self.allocate_id();
        let dir = self.root.join(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CollaboratorError::CreateFailed(e.to_string()))?;

        let container = Container {
            id: EnvironmentId::new(id.clone()),
            name: req.name,
            status: ContainerStatus::Ready,
            created_at: self.clock.now_rfc3339(),
            metadata: req.environment,
        };

        self.containers
            .lock()
            .insert(id, Entry { container: container.clone(), dir });
        Ok(container)
    }

    async fn destroy(&self, env_id: &str) -> Result<(), CollaboratorError> {
        let dir = {
            let mut containers = self.containers.lock();
            containers
                .remove(env_id)
                .map(|entry| entry.dir)
                .ok_or_else(|| CollaboratorError::NotFound(env_id.to_string()))?
        };
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| CollaboratorError::DestroyFailed(e.to_string()))
    }

    async fn get_status(&self, env_id: &str) -> Result<ContainerStatus, CollaboratorError> {
        self.containers
            .lock()
            .get(env_id)
            .map(|entry| entry.container.status)
            .ok_or_else(|| CollaboratorError::NotFound(env_id.to_string()))
    }

    async fn reap_unreferenced(&self, live_env_ids: &[String]) -> Result<usize, CollaboratorError> {
        let stale: Vec<String> = {
            let containers = self.containers.lock();
            containers
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
#[path = "local_tests.rs"]
mod tests;
