// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Manager Service
//!
//! Use cases for agents inside an organization/project scope. Every call
//! resolves the caller's organization and the project from the local ledger
//! first, so a missing scope is reported before anything reaches the
//! platform.
//!
//! Creating an `internal` agent is a [`Saga`]: the local row is written first
//! so concurrent creates collide on the ledger's uniqueness constraint, then
//! the platform component, initial build and deployment binding follow. Any
//! failure unwinds what was committed. `external` agents are ledger-only and
//! are rejected by every operation that would need the platform.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use crate::application::saga::Saga;
use crate::domain::agent::{
    Agent, AgentType, AgentView, CreateAgentRequest, DeployRequest, Organization, OrganizationId,
    Page, Paginated, Project, ProjectId, Provisioning, ResourceNameRequest, ResourceType,
    SourceRepository,
};
use crate::domain::context::RequestContext;
use crate::domain::naming::{self, NameGenerationError, NameOracle};
use crate::domain::observability::{BuildLogQuery, BuildLogService, BuildLogs};
use crate::domain::platform::{
    filter_system_env_vars, AgentComponent, Build, BuildDetails, ComponentRef, Deployment,
    EndpointDetails, EnvVar, PlatformClient, PlatformError,
};
use crate::domain::repository::{
    AgentRepository, OrganizationRepository, ProjectRepository, RepositoryError,
};

/// Time budget for compensating calls, independent of the failed request.
pub const COMPENSATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Coarse classification for the outer transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    UnsupportedForType,
    RemoteOperationFailed,
    InvalidRequest,
    Cancelled,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentManagerError {
    #[error("organization '{0}' not found")]
    OrganizationNotFound(String),

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error("build '{0}' not found")]
    BuildNotFound(String),

    #[error("environment '{0}' not found")]
    EnvironmentNotFound(String),

    #[error("deployment pipeline '{0}' not found")]
    PipelineNotFound(String),

    #[error("organization '{0}' already exists")]
    OrganizationAlreadyExists(String),

    #[error("agent '{0}' already exists")]
    AgentAlreadyExists(String),

    #[error("project '{0}' already exists")]
    ProjectAlreadyExists(String),

    #[error("{operation} is not supported for {agent_type} agents")]
    UnsupportedForType {
        operation: &'static str,
        agent_type: AgentType,
    },

    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error("{context}: {source}")]
    Repository {
        context: String,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    NameGeneration(#[from] NameGenerationError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} cancelled")]
    Cancelled(String),
}

impl AgentManagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentManagerError::OrganizationNotFound(_)
            | AgentManagerError::ProjectNotFound(_)
            | AgentManagerError::AgentNotFound(_)
            | AgentManagerError::BuildNotFound(_)
            | AgentManagerError::EnvironmentNotFound(_)
            | AgentManagerError::PipelineNotFound(_) => ErrorKind::NotFound,
            AgentManagerError::OrganizationAlreadyExists(_)
            | AgentManagerError::AgentAlreadyExists(_)
            | AgentManagerError::ProjectAlreadyExists(_) => ErrorKind::Conflict,
            AgentManagerError::UnsupportedForType { .. } => ErrorKind::UnsupportedForType,
            AgentManagerError::Remote {
                source: PlatformError::Cancelled(_),
                ..
            } => ErrorKind::Cancelled,
            AgentManagerError::Remote { .. } => ErrorKind::RemoteOperationFailed,
            AgentManagerError::Repository {
                source: RepositoryError::Cancelled,
                ..
            } => ErrorKind::Cancelled,
            AgentManagerError::Repository { .. } => ErrorKind::Internal,
            AgentManagerError::NameGeneration(NameGenerationError::EmptyCandidate(_)) => {
                ErrorKind::InvalidRequest
            }
            AgentManagerError::NameGeneration(NameGenerationError::Exhausted { .. }) => {
                ErrorKind::Conflict
            }
            AgentManagerError::NameGeneration(NameGenerationError::Oracle(_)) => {
                ErrorKind::Internal
            }
            AgentManagerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AgentManagerError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

pub(crate) fn remote(operation: &'static str) -> impl FnOnce(PlatformError) -> AgentManagerError {
    move |source| AgentManagerError::Remote { operation, source }
}

pub(crate) fn repository(
    context: impl Into<String>,
) -> impl FnOnce(RepositoryError) -> AgentManagerError {
    let context = context.into();
    move |source| AgentManagerError::Repository { context, source }
}

/// Organization of the calling user named `org_name`.
pub(crate) async fn resolve_org(
    organizations: &dyn OrganizationRepository,
    ctx: &RequestContext,
    org_name: &str,
) -> Result<Organization, AgentManagerError> {
    organizations
        .find_by_name(ctx, ctx.user_idp_id, org_name)
        .await
        .map_err(repository(format!("failed to look up organization '{}'", org_name)))?
        .ok_or_else(|| AgentManagerError::OrganizationNotFound(org_name.to_string()))
}

pub(crate) async fn resolve_project(
    projects: &dyn ProjectRepository,
    ctx: &RequestContext,
    org: &Organization,
    project_name: &str,
) -> Result<Project, AgentManagerError> {
    projects
        .find_by_name(ctx, org.id, project_name)
        .await
        .map_err(repository(format!("failed to look up project '{}'", project_name)))?
        .ok_or_else(|| AgentManagerError::ProjectNotFound(project_name.to_string()))
}

#[async_trait]
pub trait AgentManagerService: Send + Sync {
    async fn get_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<AgentView, AgentManagerError>;

    async fn list_agents(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        page: Page,
    ) -> Result<Paginated<AgentView>, AgentManagerError>;

    async fn create_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        request: CreateAgentRequest,
    ) -> Result<Agent, AgentManagerError>;

    /// Succeeds when the agent does not exist.
    async fn delete_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<(), AgentManagerError>;

    /// Empty `commit_id` builds the branch head.
    async fn build_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        commit_id: &str,
    ) -> Result<Build, AgentManagerError>;

    async fn deploy_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        request: &DeployRequest,
    ) -> Result<(), AgentManagerError>;

    async fn list_agent_builds(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        page: Page,
    ) -> Result<Paginated<Build>, AgentManagerError>;

    async fn get_build(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        build_name: &str,
    ) -> Result<BuildDetails, AgentManagerError>;

    async fn get_build_logs(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        build_name: &str,
    ) -> Result<BuildLogs, AgentManagerError>;

    async fn get_agent_deployments(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<Vec<Deployment>, AgentManagerError>;

    async fn get_agent_endpoints(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        environment: &str,
    ) -> Result<HashMap<String, EndpointDetails>, AgentManagerError>;

    /// User-visible configuration; platform-injected variables are removed.
    async fn get_agent_configurations(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        environment: &str,
    ) -> Result<Vec<EnvVar>, AgentManagerError>;

    async fn generate_name(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        request: &ResourceNameRequest,
    ) -> Result<String, AgentManagerError>;
}

/// Resolved organization/project pair.
struct Scope {
    org: Organization,
    project: Project,
}

impl Scope {
    fn component<'a>(&'a self, agent_name: &'a str) -> ComponentRef<'a> {
        ComponentRef::new(&self.org.platform_org_name, self.project.platform_name(), agent_name)
    }
}

pub struct StandardAgentManagerService {
    organizations: Arc<dyn OrganizationRepository>,
    projects: Arc<dyn ProjectRepository>,
    agents: Arc<dyn AgentRepository>,
    platform: Arc<dyn PlatformClient>,
    build_logs: Arc<dyn BuildLogService>,
}

impl StandardAgentManagerService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        projects: Arc<dyn ProjectRepository>,
        agents: Arc<dyn AgentRepository>,
        platform: Arc<dyn PlatformClient>,
        build_logs: Arc<dyn BuildLogService>,
    ) -> Self {
        Self {
            organizations,
            projects,
            agents,
            platform,
            build_logs,
        }
    }

    async fn resolve_scope(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
    ) -> Result<Scope, AgentManagerError> {
        let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
        let project = resolve_project(self.projects.as_ref(), ctx, &org, project_name).await?;
        Ok(Scope { org, project })
    }

    async fn find_agent(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        agent_name: &str,
    ) -> Result<Option<Agent>, AgentManagerError> {
        self.agents
            .find_by_name(ctx, scope.org.id, scope.project.id, agent_name)
            .await
            .map_err(repository(format!("failed to look up agent '{}'", agent_name)))
    }

    async fn require_agent(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        agent_name: &str,
    ) -> Result<Agent, AgentManagerError> {
        self.find_agent(ctx, scope, agent_name)
            .await?
            .ok_or_else(|| AgentManagerError::AgentNotFound(agent_name.to_string()))
    }

    /// Resolves the scope and the agent and rejects agents that have no
    /// platform presence.
    async fn require_internal(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        operation: &'static str,
    ) -> Result<(Scope, Agent), AgentManagerError> {
        let scope = self.resolve_scope(ctx, org_name, project_name).await?;
        let agent = self.require_agent(ctx, &scope, agent_name).await?;
        if !agent.is_internal() {
            return Err(AgentManagerError::UnsupportedForType {
                operation,
                agent_type: agent.agent_type,
            });
        }
        Ok((scope, agent))
    }

    async fn require_environment(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        environment: &str,
    ) -> Result<(), AgentManagerError> {
        match self
            .platform
            .get_environment(ctx, &scope.org.platform_org_name, environment)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                Err(AgentManagerError::EnvironmentNotFound(environment.to_string()))
            }
            Err(e) => Err(remote("get_environment")(e)),
        }
    }

    /// Advisory `updated_at` bump after a successful remote call.
    async fn touch_agent(&self, ctx: &RequestContext, scope: &Scope, agent_name: &str) {
        if let Err(e) = self
            .agents
            .touch(ctx, scope.org.id, scope.project.id, agent_name)
            .await
        {
            warn!(agent = agent_name, error = %e, "Failed to update agent timestamp");
        }
    }

    fn validate_create_request(request: &CreateAgentRequest) -> Result<(), AgentManagerError> {
        if request.name.trim().is_empty() {
            return Err(AgentManagerError::InvalidRequest("agent name is required".to_string()));
        }
        if request.display_name.trim().is_empty() {
            return Err(AgentManagerError::InvalidRequest("display name is required".to_string()));
        }
        if request.name.len() > naming::MAX_RESOURCE_NAME_LENGTH {
            return Err(AgentManagerError::InvalidRequest(format!(
                "agent name must be at most {} characters",
                naming::MAX_RESOURCE_NAME_LENGTH
            )));
        }
        if request.agent_type() == AgentType::Internal {
            match &request.provisioning.repository {
                Some(repo) if !repo.url.trim().is_empty() => {}
                _ => {
                    return Err(AgentManagerError::InvalidRequest(
                        "internal agents require a source repository".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    async fn provision_internal(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        agent: &Agent,
        request: &CreateAgentRequest,
    ) -> Result<(), AgentManagerError> {
        let org_name = scope.org.platform_org_name.as_str();
        let project_name = scope.project.platform_name();
        let compensation_ctx = ctx.detached(COMPENSATION_TIMEOUT);
        let mut saga = Saga::new("create_agent", agent.name.as_str());

        {
            let agents = &self.agents;
            let ctx = &compensation_ctx;
            let (org_id, project_id, name) = (agent.org_id, agent.project_id, agent.name.clone());
            saga.committed("local_record", move || async move {
                agents.delete_by_name(ctx, org_id, project_id, &name).await
            });
        }

        let platform_project = match self.platform.get_project(ctx, org_name, project_name).await {
            Ok(project) => project,
            Err(e) => {
                saga.abort("platform_project", &e).await;
                return Err(match e {
                    e if e.is_not_found() => {
                        AgentManagerError::ProjectNotFound(project_name.to_string())
                    }
                    e => remote("get_project")(e),
                });
            }
        };

        if let Err(e) = self.platform.create_component(ctx, org_name, project_name, request).await {
            saga.abort("remote_component", &e).await;
            return Err(remote("create_component")(e));
        }
        {
            let platform = &self.platform;
            let ctx = &compensation_ctx;
            let name = agent.name.as_str();
            saga.committed("remote_component", move || async move {
                platform
                    .delete_component(ctx, ComponentRef::new(org_name, project_name, name))
                    .await
            });
        }

        let component = ComponentRef::new(org_name, project_name, &agent.name);
        match self.platform.trigger_build(ctx, component, "").await {
            Ok(build) => {
                debug!(agent = %agent.name, build = %build.name, "Initial build triggered")
            }
            Err(e) => {
                saga.abort("build", &e).await;
                return Err(remote("trigger_build")(e));
            }
        }

        let pipeline = platform_project.pipeline_or_default();
        if let Err(e) = self
            .platform
            .setup_deployment(ctx, org_name, project_name, pipeline, request)
            .await
        {
            saga.abort("deployment", &e).await;
            return Err(remote("setup_deployment")(e));
        }

        saga.complete();
        Ok(())
    }
}

fn view_from_component(component: AgentComponent, agent: &Agent) -> AgentView {
    let repository = (!component.repository.repo_url.is_empty()).then(|| SourceRepository {
        url: component.repository.repo_url,
        branch: component.repository.branch,
        app_path: component.repository.app_path,
    });
    AgentView {
        name: component.name,
        display_name: component.display_name,
        description: component.description,
        project_name: component.project_name,
        created_at: component.created_at,
        status: (!component.status.is_empty()).then_some(component.status),
        provisioning: Provisioning {
            agent_type: agent.agent_type,
            repository,
        },
    }
}

#[async_trait]
impl AgentManagerService for StandardAgentManagerService {
    async fn get_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<AgentView, AgentManagerError> {
        async move {
            let scope = self.resolve_scope(ctx, org_name, project_name).await?;
            let agent = self.require_agent(ctx, &scope, agent_name).await?;
            if !agent.is_internal() {
                return Ok(AgentView::from_local(&agent, &scope.project.name));
            }

            match self.platform.get_component(ctx, scope.component(agent_name)).await {
                Ok(component) => Ok(view_from_component(component, &agent)),
                Err(e) if e.is_not_found() => {
                    Err(AgentManagerError::AgentNotFound(agent_name.to_string()))
                }
                Err(e) => Err(remote("get_component")(e)),
            }
        }
        .instrument(ctx.span("get_agent"))
        .await
    }

    async fn list_agents(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        page: Page,
    ) -> Result<Paginated<AgentView>, AgentManagerError> {
        async move {
            let scope = self.resolve_scope(ctx, org_name, project_name).await?;
            let mut agents = self
                .agents
                .list(ctx, scope.org.id, scope.project.id)
                .await
                .map_err(repository("failed to list agents"))?;
            agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let views = agents
                .iter()
                .map(|a| AgentView::from_local(a, &scope.project.name))
                .collect();
            Ok(Paginated::paginate(views, page))
        }
        .instrument(ctx.span("list_agents"))
        .await
    }

    async fn create_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        request: CreateAgentRequest,
    ) -> Result<Agent, AgentManagerError> {
        async move {
            Self::validate_create_request(&request)?;
            let scope = self.resolve_scope(ctx, org_name, project_name).await?;

            if self.find_agent(ctx, &scope, &request.name).await?.is_some() {
                return Err(AgentManagerError::AgentAlreadyExists(request.name.clone()));
            }

            let agent = Agent::new(
                scope.org.id,
                scope.project.id,
                request.name.as_str(),
                request.display_name.as_str(),
                request.description.clone().unwrap_or_default(),
                request.agent_type(),
            );
            match self.agents.create(ctx, &agent).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) => {
                    return Err(AgentManagerError::AgentAlreadyExists(agent.name.clone()))
                }
                Err(e) => {
                    return Err(repository(format!("failed to record agent '{}'", agent.name))(e))
                }
            }

            if agent.is_internal() {
                self.provision_internal(ctx, &scope, &agent, &request).await?;
            }

            info!(
                agent = %agent.name,
                project = %scope.project.name,
                agent_type = %agent.agent_type,
                "Agent created"
            );
            Ok(agent)
        }
        .instrument(ctx.span("create_agent"))
        .await
    }

    async fn delete_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<(), AgentManagerError> {
        async move {
            let scope = self.resolve_scope(ctx, org_name, project_name).await?;
            let Some(agent) = self.find_agent(ctx, &scope, agent_name).await? else {
                debug!(agent = agent_name, "Agent already absent");
                return Ok(());
            };

            if agent.is_internal() {
                self.platform
                    .delete_component(ctx, scope.component(agent_name))
                    .await
                    .map_err(remote("delete_component"))?;
            }

            self.agents
                .delete_by_name(ctx, scope.org.id, scope.project.id, agent_name)
                .await
                .map_err(repository(format!("failed to delete agent '{}'", agent_name)))?;

            info!(agent = agent_name, project = %scope.project.name, "Agent deleted");
            Ok(())
        }
        .instrument(ctx.span("delete_agent"))
        .await
    }

    async fn build_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        commit_id: &str,
    ) -> Result<Build, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "build")
                .await?;
            let build = self
                .platform
                .trigger_build(ctx, scope.component(agent_name), commit_id)
                .await
                .map_err(remote("trigger_build"))?;
            self.touch_agent(ctx, &scope, agent_name).await;

            info!(agent = agent_name, build = %build.name, "Build triggered");
            Ok(build)
        }
        .instrument(ctx.span("build_agent"))
        .await
    }

    async fn deploy_agent(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        request: &DeployRequest,
    ) -> Result<(), AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "deploy")
                .await?;
            self.platform
                .deploy(ctx, scope.component(agent_name), request)
                .await
                .map_err(remote("deploy"))?;
            self.touch_agent(ctx, &scope, agent_name).await;

            info!(agent = agent_name, image = %request.image_id, "Agent deployed");
            Ok(())
        }
        .instrument(ctx.span("deploy_agent"))
        .await
    }

    async fn list_agent_builds(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        page: Page,
    ) -> Result<Paginated<Build>, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "list builds")
                .await?;
            let builds = self
                .platform
                .list_builds(ctx, scope.component(agent_name))
                .await
                .map_err(remote("list_builds"))?;
            Ok(Paginated::paginate(builds, page))
        }
        .instrument(ctx.span("list_agent_builds"))
        .await
    }

    async fn get_build(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        build_name: &str,
    ) -> Result<BuildDetails, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "get build")
                .await?;
            match self
                .platform
                .get_build(ctx, scope.component(agent_name), build_name)
                .await
            {
                Ok(build) => Ok(build),
                Err(e) if e.is_not_found() => {
                    Err(AgentManagerError::BuildNotFound(build_name.to_string()))
                }
                Err(e) => Err(remote("get_build")(e)),
            }
        }
        .instrument(ctx.span("get_build"))
        .await
    }

    async fn get_build_logs(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        build_name: &str,
    ) -> Result<BuildLogs, AgentManagerError> {
        async move {
            let build = self
                .get_build(ctx, org_name, project_name, agent_name, build_name)
                .await?;
            let query = BuildLogQuery {
                org: org_name,
                project: project_name,
                agent: agent_name,
                build_name,
                build_uuid: &build.build.uuid,
            };
            self.build_logs
                .get_build_logs(ctx, query)
                .await
                .map_err(remote("get_build_logs"))
        }
        .instrument(ctx.span("get_build_logs"))
        .await
    }

    async fn get_agent_deployments(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
    ) -> Result<Vec<Deployment>, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "get deployments")
                .await?;
            let platform_project = match self
                .platform
                .get_project(ctx, &scope.org.platform_org_name, scope.project.platform_name())
                .await
            {
                Ok(project) => project,
                Err(e) if e.is_not_found() => {
                    return Err(AgentManagerError::ProjectNotFound(project_name.to_string()))
                }
                Err(e) => return Err(remote("get_project")(e)),
            };

            self.platform
                .get_deployments(
                    ctx,
                    scope.component(agent_name),
                    platform_project.pipeline_or_default(),
                )
                .await
                .map_err(remote("get_deployments"))
        }
        .instrument(ctx.span("get_agent_deployments"))
        .await
    }

    async fn get_agent_endpoints(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        environment: &str,
    ) -> Result<HashMap<String, EndpointDetails>, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "get endpoints")
                .await?;
            self.require_environment(ctx, &scope, environment).await?;
            self.platform
                .get_endpoints(ctx, scope.component(agent_name), environment)
                .await
                .map_err(remote("get_endpoints"))
        }
        .instrument(ctx.span("get_agent_endpoints"))
        .await
    }

    async fn get_agent_configurations(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
        agent_name: &str,
        environment: &str,
    ) -> Result<Vec<EnvVar>, AgentManagerError> {
        async move {
            let (scope, _) = self
                .require_internal(ctx, org_name, project_name, agent_name, "get configurations")
                .await?;
            self.require_environment(ctx, &scope, environment).await?;
            let vars = self
                .platform
                .get_configurations(ctx, scope.component(agent_name), environment)
                .await
                .map_err(remote("get_configurations"))?;
            Ok(filter_system_env_vars(vars))
        }
        .instrument(ctx.span("get_agent_configurations"))
        .await
    }

    async fn generate_name(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        request: &ResourceNameRequest,
    ) -> Result<String, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            let name = match request.resource_type {
                ResourceType::Agent => {
                    let project_name = request.project_name.as_deref().ok_or_else(|| {
                        AgentManagerError::InvalidRequest(
                            "project name is required for agent names".to_string(),
                        )
                    })?;
                    let project =
                        resolve_project(self.projects.as_ref(), ctx, &org, project_name).await?;
                    let oracle = AgentNameOracle {
                        agents: self.agents.as_ref(),
                        ctx,
                        org_id: org.id,
                        project_id: project.id,
                    };
                    naming::generate(&request.display_name, &oracle).await?
                }
                ResourceType::Project => {
                    let oracle = ProjectNameOracle {
                        projects: self.projects.as_ref(),
                        ctx,
                        org_id: org.id,
                    };
                    naming::generate(&request.display_name, &oracle).await?
                }
            };
            debug!(display_name = %request.display_name, name = %name, "Generated resource name");
            Ok(name)
        }
        .instrument(ctx.span("generate_name"))
        .await
    }
}

/// Agent names are unique per (org, project) among live rows.
struct AgentNameOracle<'a> {
    agents: &'a dyn AgentRepository,
    ctx: &'a RequestContext,
    org_id: OrganizationId,
    project_id: ProjectId,
}

#[async_trait]
impl NameOracle for AgentNameOracle<'_> {
    async fn is_taken(&self, candidate: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .agents
            .find_by_name(self.ctx, self.org_id, self.project_id, candidate)
            .await?
            .is_some())
    }
}

/// Project names are unique per org among live rows.
struct ProjectNameOracle<'a> {
    projects: &'a dyn ProjectRepository,
    ctx: &'a RequestContext,
    org_id: OrganizationId,
}

#[async_trait]
impl NameOracle for ProjectNameOracle<'_> {
    async fn is_taken(&self, candidate: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .projects
            .find_by_name(self.ctx, self.org_id, candidate)
            .await?
            .is_some())
    }
}
