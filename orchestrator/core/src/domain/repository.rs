// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the local ownership ledger. One repository per
//! aggregate, interface defined here, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Aggregate | Trait | Implementations |
//! |-----------|-------|-----------------|
//! | `Organization` | `OrganizationRepository` | `InMemory*`, `Postgres*` |
//! | `Project` | `ProjectRepository` | `InMemory*`, `Postgres*` |
//! | `Agent` | `AgentRepository` | `InMemory*`, `Postgres*` |
//!
//! Implementations are named after the trait, e.g. `PostgresAgentRepository`.
//!
//! Point lookups return `Ok(None)` for a missing row so callers can tell
//! "absent" apart from "the store failed". Soft-deleted rows are invisible to
//! every read.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::agent::{Agent, Organization, OrganizationId, Project, ProjectId};
use crate::domain::context::RequestContext;

/// Storage backend selection
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Organization owned by `user_idp_id` whose name is `org_name`.
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
        org_name: &str,
    ) -> Result<Option<Organization>, RepositoryError>;

    async fn list_for_user(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
    ) -> Result<Vec<Organization>, RepositoryError>;

    async fn create(&self, ctx: &RequestContext, org: &Organization) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<Option<Project>, RepositoryError>;

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
    ) -> Result<Vec<Project>, RepositoryError>;

    /// Fails with `Conflict` when a live project already has the name.
    async fn create(&self, ctx: &RequestContext, project: &Project) -> Result<(), RepositoryError>;

    /// Soft delete. Deleting a missing project is not an error.
    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<Option<Agent>, RepositoryError>;

    /// Live agents of a project, unordered.
    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
    ) -> Result<Vec<Agent>, RepositoryError>;

    /// Fails with `Conflict` when a live agent already has the name.
    async fn create(&self, ctx: &RequestContext, agent: &Agent) -> Result<(), RepositoryError>;

    /// Soft delete. Deleting a missing agent is not an error.
    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError>;

    /// Bumps `updated_at`.
    async fn touch(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
