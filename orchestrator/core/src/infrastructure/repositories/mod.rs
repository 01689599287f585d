// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the ledger repositories defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! Backed by the `organizations`, `projects` and `agents` tables. Every call
//! goes through the [`ResilientExecutor`](crate::infrastructure::db::ResilientExecutor):
//! - **PostgresOrganizationRepository**
//! - **PostgresProjectRepository**
//! - **PostgresAgentRepository**
//!
//! ## In-Memory Repositories
//!
//! HashMap-backed implementations for tests and local development. Name
//! uniqueness among live rows is enforced under the write lock, so concurrent
//! creates race exactly like they do against the database constraint.
//!
//! # Usage
//!
//! ```ignore
//! let database = Database::new(&connection_string, &config.spec.database).await?;
//! let executor = ResilientExecutor::from_config(&database, &config.spec.database);
//! let agents = PostgresAgentRepository::new(executor.clone());
//!
//! let agent = agents.find_by_name(&ctx, org.id, project.id, "support-bot").await?;
//! ```

pub mod postgres_agent;
pub mod postgres_organization;
pub mod postgres_project;

pub use postgres_agent::PostgresAgentRepository;
pub use postgres_organization::PostgresOrganizationRepository;
pub use postgres_project::PostgresProjectRepository;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentId, Organization, OrganizationId, Project, ProjectId};
use crate::domain::context::RequestContext;
use crate::domain::repository::{
    AgentRepository, OrganizationRepository, ProjectRepository, RepositoryError,
};

fn ensure_live(ctx: &RequestContext) -> Result<(), RepositoryError> {
    if ctx.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct InMemoryOrganizationRepository {
    organizations: Arc<RwLock<HashMap<OrganizationId, Organization>>>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
        org_name: &str,
    ) -> Result<Option<Organization>, RepositoryError> {
        ensure_live(ctx)?;
        let organizations = self.organizations.read().await;
        Ok(organizations
            .values()
            .find(|o| o.user_idp_id == user_idp_id && o.name == org_name)
            .cloned())
    }

    async fn list_for_user(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
    ) -> Result<Vec<Organization>, RepositoryError> {
        ensure_live(ctx)?;
        let organizations = self.organizations.read().await;
        Ok(organizations
            .values()
            .filter(|o| o.user_idp_id == user_idp_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        org: &Organization,
    ) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut organizations = self.organizations.write().await;
        if organizations
            .values()
            .any(|o| o.user_idp_id == org.user_idp_id && o.name == org.name)
        {
            return Err(RepositoryError::Conflict(format!(
                "organization '{}' already exists",
                org.name
            )));
        }
        organizations.insert(org.id, org.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProjectRepository {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        ensure_live(ctx)?;
        let projects = self.projects.read().await;
        Ok(projects
            .values()
            .find(|p| p.org_id == org_id && p.name == project_name && p.deleted_at.is_none())
            .cloned())
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
    ) -> Result<Vec<Project>, RepositoryError> {
        ensure_live(ctx)?;
        let projects = self.projects.read().await;
        Ok(projects
            .values()
            .filter(|p| p.org_id == org_id && p.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &RequestContext, project: &Project) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut projects = self.projects.write().await;
        if projects
            .values()
            .any(|p| p.org_id == project.org_id && p.name == project.name && p.deleted_at.is_none())
        {
            return Err(RepositoryError::Conflict(format!(
                "project '{}' already exists",
                project.name
            )));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut projects = self.projects.write().await;
        let now = Utc::now();
        for project in projects
            .values_mut()
            .filter(|p| p.org_id == org_id && p.name == project_name && p.deleted_at.is_none())
        {
            project.deleted_at = Some(now);
            project.updated_at = now;
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<RwLock<HashMap<AgentId, Agent>>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows including soft-deleted ones.
    pub async fn all_rows(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }
}

fn is_live_match(agent: &Agent, org_id: OrganizationId, project_id: ProjectId, name: &str) -> bool {
    agent.org_id == org_id
        && agent.project_id == project_id
        && agent.name == name
        && agent.deleted_at.is_none()
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<Option<Agent>, RepositoryError> {
        ensure_live(ctx)?;
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .find(|a| is_live_match(a, org_id, project_id, agent_name))
            .cloned())
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
    ) -> Result<Vec<Agent>, RepositoryError> {
        ensure_live(ctx)?;
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .filter(|a| a.org_id == org_id && a.project_id == project_id && a.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &RequestContext, agent: &Agent) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut agents = self.agents.write().await;
        if agents
            .values()
            .any(|a| is_live_match(a, agent.org_id, agent.project_id, &agent.name))
        {
            return Err(RepositoryError::Conflict(format!("agent '{}' already exists", agent.name)));
        }
        agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut agents = self.agents.write().await;
        let now = Utc::now();
        for agent in agents
            .values_mut()
            .filter(|a| is_live_match(a, org_id, project_id, agent_name))
        {
            agent.deleted_at = Some(now);
        }
        Ok(())
    }

    async fn touch(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        ensure_live(ctx)?;
        let mut agents = self.agents.write().await;
        match agents
            .values_mut()
            .find(|a| is_live_match(a, org_id, project_id, agent_name))
        {
            Some(agent) => {
                agent.updated_at = Utc::now();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("agent '{}'", agent_name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentType;

    fn ids() -> (OrganizationId, ProjectId) {
        (OrganizationId(Uuid::new_v4()), ProjectId(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_soft_deleted_name_can_be_reused() {
        let ctx = RequestContext::new(Uuid::new_v4());
        let repo = InMemoryAgentRepository::new();
        let (org, project) = ids();

        let first = Agent::new(org, project, "bot", "Bot", "", AgentType::External);
        repo.create(&ctx, &first).await.unwrap();
        let second = Agent::new(org, project, "bot", "Bot", "", AgentType::External);
        assert!(matches!(
            repo.create(&ctx, &second).await,
            Err(RepositoryError::Conflict(_))
        ));

        repo.delete_by_name(&ctx, org, project, "bot").await.unwrap();
        assert!(repo.find_by_name(&ctx, org, project, "bot").await.unwrap().is_none());

        repo.create(&ctx, &Agent::new(org, project, "bot", "Bot", "", AgentType::External))
            .await
            .unwrap();
        assert_eq!(repo.all_rows().await.len(), 2);
        assert_eq!(repo.list(&ctx, org, project).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_in_other_project_is_independent() {
        let ctx = RequestContext::new(Uuid::new_v4());
        let repo = InMemoryAgentRepository::new();
        let (org, project) = ids();
        let other_project = ProjectId(Uuid::new_v4());

        repo.create(&ctx, &Agent::new(org, project, "bot", "Bot", "", AgentType::Internal))
            .await
            .unwrap();
        repo.create(&ctx, &Agent::new(org, other_project, "bot", "Bot", "", AgentType::Internal))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_touch_missing_agent_is_not_found() {
        let ctx = RequestContext::new(Uuid::new_v4());
        let repo = InMemoryAgentRepository::new();
        let (org, project) = ids();
        assert!(matches!(
            repo.touch(&ctx, org, project, "ghost").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_project_frees_its_name() {
        let ctx = RequestContext::new(Uuid::new_v4());
        let repo = InMemoryProjectRepository::new();
        let org = OrganizationId(Uuid::new_v4());
        let project = |name: &str| Project {
            id: ProjectId(Uuid::new_v4()),
            org_id: org,
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            platform_project: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        repo.create(&ctx, &project("lab")).await.unwrap();
        assert!(matches!(
            repo.create(&ctx, &project("lab")).await,
            Err(RepositoryError::Conflict(_))
        ));

        repo.delete_by_name(&ctx, org, "lab").await.unwrap();
        repo.delete_by_name(&ctx, org, "lab").await.unwrap();
        assert!(repo.find_by_name(&ctx, org, "lab").await.unwrap().is_none());
        repo.create(&ctx, &project("lab")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_context_is_rejected() {
        let ctx = RequestContext::new(Uuid::new_v4());
        ctx.cancel();
        let repo = InMemoryProjectRepository::new();
        assert!(matches!(
            repo.list(&ctx, OrganizationId(Uuid::new_v4())).await,
            Err(RepositoryError::Cancelled)
        ));
    }
}
