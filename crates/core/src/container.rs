// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Container/environment data model.
//!
//! The engine only ever sees the shapes in this module; the concrete
//! provider (local sandbox, mock, remote) lives in `trails-adapters` and is
//! reached solely through `ContainerCollaborator`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use crate::id::EnvironmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Creating,
    Ready,
    Error,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: EnvironmentId,
    pub name: String,
    pub status: ContainerStatus,
    pub created_at: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request passed to `ContainerCollaborator::create`.
#[derive(Debug, Clone, Default)]
pub struct CreateContainerRequest {
    pub name: String,
    pub source: String,
    pub environment: HashMap<String, String>,
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
