// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Resource Service
//!
//! Organizations and projects the agent manager scopes agents by, plus the
//! platform environments and deployment pipelines behind them.
//!
//! An organization is a per-user binding of a local name to an existing
//! platform organization. Creating a project writes the local row first so
//! concurrent creates collide on the ledger's uniqueness constraint, then
//! creates the platform project; a platform failure soft-deletes the row
//! again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::application::agent_manager::{
    remote, repository, resolve_org, resolve_project, AgentManagerError, COMPENSATION_TIMEOUT,
};
use crate::application::saga::Saga;
use crate::domain::agent::{
    CreateOrganizationRequest, CreateProjectRequest, Organization, OrganizationId,
    OrganizationView, Page, Paginated, Project, ProjectId, ProjectView,
};
use crate::domain::context::RequestContext;
use crate::domain::naming;
use crate::domain::platform::{
    DeploymentPipeline, Environment, NewPlatformProject, PlatformClient,
    DEFAULT_DEPLOYMENT_PIPELINE,
};
use crate::domain::repository::{OrganizationRepository, ProjectRepository, RepositoryError};

#[async_trait]
pub trait InfraResourceService: Send + Sync {
    async fn create_organization(
        &self,
        ctx: &RequestContext,
        request: &CreateOrganizationRequest,
    ) -> Result<OrganizationView, AgentManagerError>;

    /// Organizations of the calling user, oldest first.
    async fn list_organizations(
        &self,
        ctx: &RequestContext,
        page: Page,
    ) -> Result<Paginated<OrganizationView>, AgentManagerError>;

    async fn get_organization(
        &self,
        ctx: &RequestContext,
        org_name: &str,
    ) -> Result<OrganizationView, AgentManagerError>;

    async fn create_project(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        request: &CreateProjectRequest,
    ) -> Result<ProjectView, AgentManagerError>;

    /// Projects of an organization, newest first.
    async fn list_projects(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        page: Page,
    ) -> Result<Paginated<ProjectView>, AgentManagerError>;

    async fn get_project(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
    ) -> Result<ProjectView, AgentManagerError>;

    async fn get_org_environments(
        &self,
        ctx: &RequestContext,
        org_name: &str,
    ) -> Result<Vec<Environment>, AgentManagerError>;

    async fn get_project_deployment_pipeline(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
    ) -> Result<DeploymentPipeline, AgentManagerError>;
}

/// Names must already be in canonical resource-name form.
fn validate_resource_name(kind: &str, name: &str) -> Result<(), AgentManagerError> {
    if name.trim().is_empty() {
        return Err(AgentManagerError::InvalidRequest(format!("{} name is required", kind)));
    }
    match naming::candidate_name(name) {
        Ok(canonical) if canonical == name => Ok(()),
        _ => Err(AgentManagerError::InvalidRequest(format!(
            "{} name '{}' must be lowercase letters, digits and single hyphens, \
             at most {} characters",
            kind,
            name,
            naming::MAX_RESOURCE_NAME_LENGTH
        ))),
    }
}

pub struct StandardInfraResourceService {
    organizations: Arc<dyn OrganizationRepository>,
    projects: Arc<dyn ProjectRepository>,
    platform: Arc<dyn PlatformClient>,
}

impl StandardInfraResourceService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        projects: Arc<dyn ProjectRepository>,
        platform: Arc<dyn PlatformClient>,
    ) -> Self {
        Self {
            organizations,
            projects,
            platform,
        }
    }

    async fn platform_pipeline(
        &self,
        ctx: &RequestContext,
        org: &Organization,
        project: &Project,
    ) -> Result<String, AgentManagerError> {
        match self
            .platform
            .get_project(ctx, &org.platform_org_name, project.platform_name())
            .await
        {
            Ok(remote_project) => Ok(remote_project.pipeline_or_default().to_string()),
            Err(e) if e.is_not_found() => {
                Err(AgentManagerError::ProjectNotFound(project.name.clone()))
            }
            Err(e) => Err(remote("get_project")(e)),
        }
    }
}

#[async_trait]
impl InfraResourceService for StandardInfraResourceService {
    async fn create_organization(
        &self,
        ctx: &RequestContext,
        request: &CreateOrganizationRequest,
    ) -> Result<OrganizationView, AgentManagerError> {
        async move {
            validate_resource_name("organization", &request.name)?;
            let platform_org_name = request
                .platform_org_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| request.name.clone());

            let remote_org = match self.platform.get_organization(ctx, &platform_org_name).await {
                Ok(org) => org,
                Err(e) if e.is_not_found() => {
                    return Err(AgentManagerError::OrganizationNotFound(platform_org_name))
                }
                Err(e) => return Err(remote("get_organization")(e)),
            };

            let org = Organization {
                id: OrganizationId(Uuid::new_v4()),
                name: request.name.clone(),
                platform_org_name,
                user_idp_id: ctx.user_idp_id,
                created_at: Utc::now(),
            };
            match self.organizations.create(ctx, &org).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) => {
                    return Err(AgentManagerError::OrganizationAlreadyExists(org.name))
                }
                Err(e) => {
                    let context = format!("failed to record organization '{}'", org.name);
                    return Err(repository(context)(e));
                }
            }

            info!(org = %org.name, platform_org = %org.platform_org_name, "Organization created");
            Ok(OrganizationView {
                display_name: remote_org.display_name,
                description: remote_org.description,
                namespace: remote_org.namespace,
                status: (!remote_org.status.is_empty()).then_some(remote_org.status),
                ..OrganizationView::from_local(&org)
            })
        }
        .instrument(ctx.span("create_organization"))
        .await
    }

    async fn list_organizations(
        &self,
        ctx: &RequestContext,
        page: Page,
    ) -> Result<Paginated<OrganizationView>, AgentManagerError> {
        async move {
            let mut orgs = self
                .organizations
                .list_for_user(ctx, ctx.user_idp_id)
                .await
                .map_err(repository("failed to list organizations"))?;
            orgs.sort_by(|a, b| a.created_at.cmp(&b.created_at));

            let views = orgs.iter().map(OrganizationView::from_local).collect();
            Ok(Paginated::paginate(views, page))
        }
        .instrument(ctx.span("list_organizations"))
        .await
    }

    async fn get_organization(
        &self,
        ctx: &RequestContext,
        org_name: &str,
    ) -> Result<OrganizationView, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            let remote_org = match self
                .platform
                .get_organization(ctx, &org.platform_org_name)
                .await
            {
                Ok(remote_org) => remote_org,
                Err(e) if e.is_not_found() => {
                    return Err(AgentManagerError::OrganizationNotFound(org_name.to_string()))
                }
                Err(e) => return Err(remote("get_organization")(e)),
            };

            Ok(OrganizationView {
                display_name: remote_org.display_name,
                description: remote_org.description,
                namespace: remote_org.namespace,
                status: (!remote_org.status.is_empty()).then_some(remote_org.status),
                ..OrganizationView::from_local(&org)
            })
        }
        .instrument(ctx.span("get_organization"))
        .await
    }

    async fn create_project(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        request: &CreateProjectRequest,
    ) -> Result<ProjectView, AgentManagerError> {
        async move {
            validate_resource_name("project", &request.name)?;
            if request.display_name.trim().is_empty() {
                return Err(AgentManagerError::InvalidRequest(
                    "display name is required".to_string(),
                ));
            }
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;

            let existing = self
                .projects
                .find_by_name(ctx, org.id, &request.name)
                .await
                .map_err(repository(format!("failed to look up project '{}'", request.name)))?;
            if existing.is_some() {
                return Err(AgentManagerError::ProjectAlreadyExists(request.name.clone()));
            }

            let now = Utc::now();
            let project = Project {
                id: ProjectId(Uuid::new_v4()),
                org_id: org.id,
                name: request.name.clone(),
                display_name: request.display_name.clone(),
                description: request.description.clone().unwrap_or_default(),
                platform_project: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            match self.projects.create(ctx, &project).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) => {
                    return Err(AgentManagerError::ProjectAlreadyExists(project.name))
                }
                Err(e) => {
                    let context = format!("failed to record project '{}'", project.name);
                    return Err(repository(context)(e));
                }
            }

            let compensation_ctx = ctx.detached(COMPENSATION_TIMEOUT);
            let mut saga = Saga::new("create_project", project.name.as_str());
            {
                let projects = &self.projects;
                let ctx = &compensation_ctx;
                let (org_id, name) = (org.id, project.name.clone());
                saga.committed("local_record", move || async move {
                    projects.delete_by_name(ctx, org_id, &name).await
                });
            }

            let pipeline = request
                .deployment_pipeline
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT_PIPELINE.to_string());
            let body = NewPlatformProject {
                name: project.name.clone(),
                display_name: project.display_name.clone(),
                description: project.description.clone(),
                deployment_pipeline: pipeline.clone(),
            };
            if let Err(e) = self
                .platform
                .create_project(ctx, &org.platform_org_name, &body)
                .await
            {
                saga.abort("remote_project", &e).await;
                return Err(remote("create_project")(e));
            }
            saga.complete();

            info!(
                org = %org.name,
                project = %project.name,
                pipeline = %pipeline,
                "Project created"
            );
            Ok(ProjectView {
                deployment_pipeline: Some(pipeline),
                ..ProjectView::from_local(&project, &org.name)
            })
        }
        .instrument(ctx.span("create_project"))
        .await
    }

    async fn list_projects(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        page: Page,
    ) -> Result<Paginated<ProjectView>, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            let mut projects = self
                .projects
                .list(ctx, org.id)
                .await
                .map_err(repository("failed to list projects"))?;
            projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let views = projects
                .iter()
                .map(|p| ProjectView::from_local(p, &org.name))
                .collect();
            Ok(Paginated::paginate(views, page))
        }
        .instrument(ctx.span("list_projects"))
        .await
    }

    async fn get_project(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
    ) -> Result<ProjectView, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            let project = resolve_project(self.projects.as_ref(), ctx, &org, project_name).await?;
            let pipeline = self.platform_pipeline(ctx, &org, &project).await?;

            Ok(ProjectView {
                deployment_pipeline: Some(pipeline),
                ..ProjectView::from_local(&project, &org.name)
            })
        }
        .instrument(ctx.span("get_project"))
        .await
    }

    async fn get_org_environments(
        &self,
        ctx: &RequestContext,
        org_name: &str,
    ) -> Result<Vec<Environment>, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            self.platform
                .list_environments(ctx, &org.platform_org_name)
                .await
                .map_err(remote("list_environments"))
        }
        .instrument(ctx.span("get_org_environments"))
        .await
    }

    async fn get_project_deployment_pipeline(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        project_name: &str,
    ) -> Result<DeploymentPipeline, AgentManagerError> {
        async move {
            let org = resolve_org(self.organizations.as_ref(), ctx, org_name).await?;
            let project = resolve_project(self.projects.as_ref(), ctx, &org, project_name).await?;
            let pipeline = self.platform_pipeline(ctx, &org, &project).await?;

            match self
                .platform
                .get_deployment_pipeline(ctx, &org.platform_org_name, &pipeline)
                .await
            {
                Ok(pipeline) => Ok(pipeline),
                Err(e) if e.is_not_found() => Err(AgentManagerError::PipelineNotFound(pipeline)),
                Err(e) => Err(remote("get_deployment_pipeline")(e)),
            }
        }
        .instrument(ctx.span("get_project_deployment_pipeline"))
        .await
    }
}
