// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use agent_manager_core::application::agent_manager::{
    AgentManagerError, AgentManagerService, ErrorKind, StandardAgentManagerService,
};
use agent_manager_core::application::build_callback::{
    BuildCallbackService, BuildCompletion, StandardBuildCallbackService,
};
use agent_manager_core::application::infra_resources::{
    InfraResourceService, StandardInfraResourceService,
};
use agent_manager_core::domain::agent::{
    Agent, AgentType, CreateAgentRequest, CreateOrganizationRequest, CreateProjectRequest,
    DeployRequest, Organization, OrganizationId, Page, Project, ProjectId, Provisioning,
    ResourceNameRequest, ResourceType, SourceRepository,
};
use agent_manager_core::domain::context::RequestContext;
use agent_manager_core::domain::naming::MAX_RESOURCE_NAME_LENGTH;
use agent_manager_core::domain::observability::{BuildLogQuery, BuildLogService, BuildLogs};
use agent_manager_core::domain::platform::{
    AgentComponent, Build, BuildDetails, ComponentRef, ComponentRepository, Deployment,
    DeploymentPipeline, Endpoint, EndpointDetails, EndpointSchema, EnvVar, Environment,
    NewPlatformProject, PlatformClient, PlatformError, PlatformOrganization, PlatformProject,
    PromotionPath, TargetEnvironmentRef,
};
use agent_manager_core::domain::repository::{
    AgentRepository, OrganizationRepository, ProjectRepository, RepositoryError,
};
use agent_manager_core::infrastructure::repositories::{
    InMemoryAgentRepository, InMemoryOrganizationRepository, InMemoryProjectRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

const ORG: &str = "acme";
const PLATFORM_ORG: &str = "acme-platform";
const PROJECT: &str = "default";

/// Platform double that records every call and fails the operations it is
/// told to fail.
#[derive(Default)]
struct MockPlatform {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    components: Mutex<HashSet<String>>,
    pipelines: Mutex<Vec<String>>,
    deployed_images: Mutex<Vec<String>>,
    created_projects: Mutex<Vec<NewPlatformProject>>,
    deployment_pipeline: String,
    platform_orgs: Vec<&'static str>,
    environments: Vec<&'static str>,
    configurations: Vec<EnvVar>,
    /// Cancels the caller's request from inside `trigger_build`.
    cancel_on_build: bool,
}

impl MockPlatform {
    fn new() -> Self {
        Self {
            environments: vec!["development"],
            platform_orgs: vec![PLATFORM_ORG],
            configurations: vec![
                EnvVar::new("OPENAI_MODEL", "gpt-4o"),
                EnvVar::new("PYTHONPATH", "/app"),
                EnvVar::new("AMP_COMPONENT_ID", "c-1"),
                EnvVar::new("LOG_LEVEL", "debug"),
            ],
            ..Self::default()
        }
    }

    fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn has_component(&self, agent: &str) -> bool {
        self.components.lock().unwrap().contains(agent)
    }

    fn record(&self, operation: &'static str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(operation);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(PlatformError::Remote {
                operation: operation.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn build(agent: &str, name: &str) -> Build {
    Build {
        uuid: format!("uuid-{}", name),
        name: name.to_string(),
        agent_name: agent.to_string(),
        project_name: PROJECT.to_string(),
        commit_id: String::new(),
        status: "BuildTriggered".to_string(),
        started_at: Utc::now(),
        image: None,
        branch: "main".to_string(),
        ended_at: None,
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn get_organization(
        &self,
        _ctx: &RequestContext,
        org: &str,
    ) -> Result<PlatformOrganization, PlatformError> {
        self.record("get_organization")?;
        if !self.platform_orgs.contains(&org) {
            return Err(PlatformError::NotFound {
                kind: "organization",
                name: org.to_string(),
            });
        }
        Ok(PlatformOrganization {
            name: org.to_string(),
            display_name: "Acme Corp".to_string(),
            description: String::new(),
            namespace: format!("ns-{}", org),
            created_at: None,
            status: "Ready".to_string(),
        })
    }

    async fn list_environments(
        &self,
        _ctx: &RequestContext,
        org: &str,
    ) -> Result<Vec<Environment>, PlatformError> {
        self.record("list_environments")?;
        Ok(self
            .environments
            .iter()
            .map(|env| Environment {
                name: env.to_string(),
                namespace: format!("{}-{}", org, env),
                display_name: env.to_string(),
                is_production: false,
                dns_prefix: env.to_string(),
            })
            .collect())
    }

    async fn create_project(
        &self,
        _ctx: &RequestContext,
        _org: &str,
        project: &NewPlatformProject,
    ) -> Result<(), PlatformError> {
        self.record("create_project")?;
        self.created_projects.lock().unwrap().push(project.clone());
        Ok(())
    }

    async fn get_deployment_pipeline(
        &self,
        _ctx: &RequestContext,
        org: &str,
        pipeline: &str,
    ) -> Result<DeploymentPipeline, PlatformError> {
        self.record("get_deployment_pipeline")?;
        if pipeline != "default" {
            return Err(PlatformError::NotFound {
                kind: "deployment pipeline",
                name: pipeline.to_string(),
            });
        }
        Ok(DeploymentPipeline {
            name: pipeline.to_string(),
            display_name: "Default Pipeline".to_string(),
            description: String::new(),
            org_name: org.to_string(),
            created_at: None,
            promotion_paths: vec![PromotionPath {
                source_environment_ref: "development".to_string(),
                target_environment_refs: vec![TargetEnvironmentRef {
                    name: "production".to_string(),
                    requires_approval: true,
                }],
            }],
        })
    }

    async fn get_project(
        &self,
        _ctx: &RequestContext,
        org: &str,
        project: &str,
    ) -> Result<PlatformProject, PlatformError> {
        self.record("get_project")?;
        Ok(PlatformProject {
            name: project.to_string(),
            org_name: org.to_string(),
            display_name: project.to_string(),
            deployment_pipeline: self.deployment_pipeline.clone(),
        })
    }

    async fn create_component(
        &self,
        _ctx: &RequestContext,
        _org: &str,
        _project: &str,
        request: &CreateAgentRequest,
    ) -> Result<(), PlatformError> {
        self.record("create_component")?;
        self.components.lock().unwrap().insert(request.name.clone());
        Ok(())
    }

    async fn delete_component(
        &self,
        _ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<(), PlatformError> {
        self.record("delete_component")?;
        self.components.lock().unwrap().remove(component.agent);
        Ok(())
    }

    async fn get_component(
        &self,
        _ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<AgentComponent, PlatformError> {
        self.record("get_component")?;
        if !self.has_component(component.agent) {
            return Err(PlatformError::NotFound {
                kind: "component",
                name: component.agent.to_string(),
            });
        }
        Ok(AgentComponent {
            name: component.agent.to_string(),
            display_name: "Support Bot".to_string(),
            description: String::new(),
            project_name: component.project.to_string(),
            created_at: Utc::now(),
            status: "Active".to_string(),
            repository: ComponentRepository {
                repo_url: "https://github.com/acme/bot".to_string(),
                branch: "main".to_string(),
                app_path: "/".to_string(),
            },
            build_template_ref: "buildpack-ci".to_string(),
        })
    }

    async fn trigger_build(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        _commit_id: &str,
    ) -> Result<Build, PlatformError> {
        self.record("trigger_build")?;
        if self.cancel_on_build {
            ctx.cancel();
            return Err(PlatformError::Cancelled("trigger_build".to_string()));
        }
        Ok(build(component.agent, "build-1"))
    }

    async fn get_build(
        &self,
        _ctx: &RequestContext,
        component: ComponentRef<'_>,
        build_name: &str,
    ) -> Result<BuildDetails, PlatformError> {
        self.record("get_build")?;
        if build_name == "missing" {
            return Err(PlatformError::NotFound {
                kind: "build",
                name: build_name.to_string(),
            });
        }
        Ok(BuildDetails {
            build: build(component.agent, build_name),
            percent: 50.0,
            steps: Vec::new(),
            duration_seconds: 12,
        })
    }

    async fn list_builds(
        &self,
        _ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<Vec<Build>, PlatformError> {
        self.record("list_builds")?;
        Ok((1..=3).map(|i| build(component.agent, &format!("build-{}", i))).collect())
    }

    async fn setup_deployment(
        &self,
        _ctx: &RequestContext,
        _org: &str,
        _project: &str,
        pipeline: &str,
        _request: &CreateAgentRequest,
    ) -> Result<(), PlatformError> {
        self.record("setup_deployment")?;
        self.pipelines.lock().unwrap().push(pipeline.to_string());
        Ok(())
    }

    async fn deploy(
        &self,
        _ctx: &RequestContext,
        _component: ComponentRef<'_>,
        request: &DeployRequest,
    ) -> Result<(), PlatformError> {
        self.record("deploy")?;
        self.deployed_images.lock().unwrap().push(request.image_id.clone());
        Ok(())
    }

    async fn deploy_built_image(
        &self,
        _ctx: &RequestContext,
        _component: ComponentRef<'_>,
        image_id: &str,
    ) -> Result<(), PlatformError> {
        self.record("deploy_built_image")?;
        self.deployed_images.lock().unwrap().push(image_id.to_string());
        Ok(())
    }

    async fn get_deployments(
        &self,
        _ctx: &RequestContext,
        component: ComponentRef<'_>,
        pipeline: &str,
    ) -> Result<Vec<Deployment>, PlatformError> {
        self.record("get_deployments")?;
        self.pipelines.lock().unwrap().push(pipeline.to_string());
        Ok(vec![Deployment {
            agent_name: component.agent.to_string(),
            project_name: component.project.to_string(),
            image_id: "registry/bot:1".to_string(),
            status: "Active".to_string(),
            environment: "development".to_string(),
            environment_display_name: "Development".to_string(),
            promotion_target_environment: None,
            last_deployed_at: Utc::now(),
            endpoints: Vec::new(),
        }])
    }

    async fn get_endpoints(
        &self,
        _ctx: &RequestContext,
        _component: ComponentRef<'_>,
        _environment: &str,
    ) -> Result<HashMap<String, EndpointDetails>, PlatformError> {
        self.record("get_endpoints")?;
        let mut endpoints = HashMap::new();
        endpoints.insert(
            "chat".to_string(),
            EndpointDetails {
                endpoint: Endpoint {
                    url: "https://bot.dev.example.com/chat".to_string(),
                    name: "chat".to_string(),
                    visibility: "Public".to_string(),
                },
                schema: EndpointSchema {
                    content: "openapi: 3.0.0".to_string(),
                },
            },
        );
        Ok(endpoints)
    }

    async fn get_configurations(
        &self,
        _ctx: &RequestContext,
        _component: ComponentRef<'_>,
        _environment: &str,
    ) -> Result<Vec<EnvVar>, PlatformError> {
        self.record("get_configurations")?;
        Ok(self.configurations.clone())
    }

    async fn get_environment(
        &self,
        _ctx: &RequestContext,
        _org: &str,
        environment: &str,
    ) -> Result<Environment, PlatformError> {
        self.record("get_environment")?;
        if !self.environments.iter().any(|e| *e == environment) {
            return Err(PlatformError::NotFound {
                kind: "environment",
                name: environment.to_string(),
            });
        }
        Ok(Environment {
            name: environment.to_string(),
            namespace: format!("dp-{}", environment),
            display_name: environment.to_string(),
            is_production: false,
            dns_prefix: environment.to_string(),
        })
    }
}

#[derive(Default)]
struct MockBuildLogs {
    queried_uuids: Mutex<Vec<String>>,
}

#[async_trait]
impl BuildLogService for MockBuildLogs {
    async fn get_build_logs(
        &self,
        _ctx: &RequestContext,
        query: BuildLogQuery<'_>,
    ) -> Result<BuildLogs, PlatformError> {
        self.queried_uuids.lock().unwrap().push(query.build_uuid.to_string());
        Ok(BuildLogs {
            logs: Vec::new(),
            total_count: 0,
            took_ms: 1.5,
        })
    }
}

/// Agent store that delegates to the in-memory repository but fails the
/// operations it is told to fail.
#[derive(Default)]
struct FaultyAgentRepository {
    inner: InMemoryAgentRepository,
    failing: Mutex<HashSet<&'static str>>,
}

impl FaultyAgentRepository {
    fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn check(&self, operation: &'static str) -> Result<(), RepositoryError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(RepositoryError::Database(format!("injected {} failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl AgentRepository for FaultyAgentRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<Option<Agent>, RepositoryError> {
        self.inner.find_by_name(ctx, org_id, project_id, agent_name).await
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
    ) -> Result<Vec<Agent>, RepositoryError> {
        self.inner.list(ctx, org_id, project_id).await
    }

    async fn create(&self, ctx: &RequestContext, agent: &Agent) -> Result<(), RepositoryError> {
        self.inner.create(ctx, agent).await
    }

    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        self.check("delete_by_name")?;
        self.inner.delete_by_name(ctx, org_id, project_id, agent_name).await
    }

    async fn touch(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        self.check("touch")?;
        self.inner.touch(ctx, org_id, project_id, agent_name).await
    }
}

struct Fixture {
    service: Arc<StandardAgentManagerService>,
    infra: StandardInfraResourceService,
    platform: Arc<MockPlatform>,
    logs: Arc<MockBuildLogs>,
    agents: InMemoryAgentRepository,
    agent_store: Arc<FaultyAgentRepository>,
    ctx: RequestContext,
}

async fn fixture_with(platform: MockPlatform) -> Fixture {
    let ctx = RequestContext::new(Uuid::new_v4());
    let organizations = InMemoryOrganizationRepository::new();
    let projects = InMemoryProjectRepository::new();
    let agent_store = Arc::new(FaultyAgentRepository::default());
    let agents = agent_store.inner.clone();

    let org = Organization {
        id: OrganizationId(Uuid::new_v4()),
        name: ORG.to_string(),
        platform_org_name: PLATFORM_ORG.to_string(),
        user_idp_id: ctx.user_idp_id,
        created_at: Utc::now(),
    };
    organizations.create(&ctx, &org).await.unwrap();
    projects
        .create(
            &ctx,
            &Project {
                id: ProjectId(Uuid::new_v4()),
                org_id: org.id,
                name: PROJECT.to_string(),
                display_name: "Default".to_string(),
                description: String::new(),
                platform_project: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            },
        )
        .await
        .unwrap();

    let platform = Arc::new(platform);
    let logs = Arc::new(MockBuildLogs::default());
    let organizations: Arc<dyn OrganizationRepository> = Arc::new(organizations);
    let projects: Arc<dyn ProjectRepository> = Arc::new(projects);
    let service = Arc::new(StandardAgentManagerService::new(
        organizations.clone(),
        projects.clone(),
        agent_store.clone(),
        platform.clone(),
        logs.clone(),
    ));
    let infra = StandardInfraResourceService::new(organizations, projects, platform.clone());

    Fixture {
        service,
        infra,
        platform,
        logs,
        agents,
        agent_store,
        ctx,
    }
}

async fn fixture() -> Fixture {
    fixture_with(MockPlatform::new()).await
}

fn internal_request(name: &str) -> CreateAgentRequest {
    CreateAgentRequest {
        name: name.to_string(),
        display_name: "Support Bot".to_string(),
        description: Some("Answers tickets".to_string()),
        provisioning: Provisioning {
            agent_type: AgentType::Internal,
            repository: Some(SourceRepository {
                url: "https://github.com/acme/bot".to_string(),
                branch: "main".to_string(),
                app_path: "/".to_string(),
            }),
        },
        runtime_configs: None,
        input_interface: None,
    }
}

fn external_request(name: &str) -> CreateAgentRequest {
    CreateAgentRequest {
        name: name.to_string(),
        display_name: "External Bot".to_string(),
        description: None,
        provisioning: Provisioning {
            agent_type: AgentType::External,
            repository: None,
        },
        runtime_configs: None,
        input_interface: None,
    }
}

async fn live_agent_count(f: &Fixture) -> usize {
    f.agents.all_rows().await.iter().filter(|a| a.deleted_at.is_none()).count()
}

#[tokio::test]
async fn test_internal_create_runs_every_step() {
    let f = fixture().await;

    let agent = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    assert_eq!(agent.name, "support-bot");
    assert_eq!(agent.agent_type, AgentType::Internal);
    assert_eq!(
        f.platform.calls(),
        vec!["get_project", "create_component", "trigger_build", "setup_deployment"]
    );
    assert_eq!(*f.platform.pipelines.lock().unwrap(), vec!["default".to_string()]);
    assert!(f.platform.has_component("support-bot"));
    assert_eq!(live_agent_count(&f).await, 1);
}

#[tokio::test]
async fn test_project_pipeline_is_used_when_set() {
    let f = fixture_with(MockPlatform {
        deployment_pipeline: "staged".to_string(),
        ..MockPlatform::new()
    })
    .await;

    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();
    assert_eq!(*f.platform.pipelines.lock().unwrap(), vec!["staged".to_string()]);
}

#[tokio::test]
async fn test_failed_component_creation_leaves_no_local_record() {
    let f = fixture().await;
    f.platform.fail("create_component");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "create_component", .. }));
    assert_eq!(err.kind(), ErrorKind::RemoteOperationFailed);
    assert_eq!(live_agent_count(&f).await, 0);
    assert!(!f.platform.calls().contains(&"delete_component"));
}

#[tokio::test]
async fn test_failed_project_lookup_leaves_no_local_record() {
    let f = fixture().await;
    f.platform.fail("get_project");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "get_project", .. }));
    assert_eq!(live_agent_count(&f).await, 0);
    assert_eq!(f.platform.calls(), vec!["get_project"]);
}

#[tokio::test]
async fn test_failed_build_removes_component_and_record() {
    let f = fixture().await;
    f.platform.fail("trigger_build");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "trigger_build", .. }));
    assert_eq!(live_agent_count(&f).await, 0);
    assert!(!f.platform.has_component("support-bot"));
    assert_eq!(
        f.platform.calls(),
        vec!["get_project", "create_component", "trigger_build", "delete_component"]
    );
}

#[tokio::test]
async fn test_failed_deployment_setup_removes_component_and_record() {
    let f = fixture().await;
    f.platform.fail("setup_deployment");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "setup_deployment", .. }));
    assert_eq!(live_agent_count(&f).await, 0);
    assert!(!f.platform.has_component("support-bot"));
}

#[tokio::test]
async fn test_failed_compensation_returns_original_error() {
    let f = fixture().await;
    f.platform.fail("setup_deployment");
    f.platform.fail("delete_component");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "setup_deployment", .. }));
    // the component is orphaned but the unwind still reaches the local record
    assert!(f.platform.has_component("support-bot"));
    assert_eq!(live_agent_count(&f).await, 0);
}

#[tokio::test]
async fn test_cancelled_request_still_compensates() {
    let f = fixture_with(MockPlatform {
        cancel_on_build: true,
        ..MockPlatform::new()
    })
    .await;

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(f.ctx.is_cancelled());
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(live_agent_count(&f).await, 0);
    assert!(!f.platform.has_component("support-bot"));
}

#[tokio::test]
async fn test_external_create_is_local_only() {
    let f = fixture().await;

    f.service
        .create_agent(&f.ctx, ORG, PROJECT, external_request("ext-bot"))
        .await
        .unwrap();
    let view = f.service.get_agent(&f.ctx, ORG, PROJECT, "ext-bot").await.unwrap();

    assert_eq!(view.provisioning.agent_type, AgentType::External);
    assert_eq!(view.project_name, PROJECT);
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn test_external_agent_rejects_platform_operations() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, external_request("ext-bot"))
        .await
        .unwrap();
    let deploy = DeployRequest {
        image_id: "registry/bot:1".to_string(),
        env: Vec::new(),
    };

    let errors = vec![
        f.service.build_agent(&f.ctx, ORG, PROJECT, "ext-bot", "").await.unwrap_err(),
        f.service.deploy_agent(&f.ctx, ORG, PROJECT, "ext-bot", &deploy).await.unwrap_err(),
        f.service
            .get_agent_endpoints(&f.ctx, ORG, PROJECT, "ext-bot", "development")
            .await
            .unwrap_err(),
        f.service
            .get_agent_configurations(&f.ctx, ORG, PROJECT, "ext-bot", "development")
            .await
            .unwrap_err(),
        f.service
            .list_agent_builds(&f.ctx, ORG, PROJECT, "ext-bot", Page::default())
            .await
            .unwrap_err(),
        f.service.get_agent_deployments(&f.ctx, ORG, PROJECT, "ext-bot").await.unwrap_err(),
    ];

    for err in errors {
        assert_eq!(err.kind(), ErrorKind::UnsupportedForType, "{}", err);
    }
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn test_duplicate_create_is_conflict() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, external_request("bot"))
        .await
        .unwrap();

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::AgentAlreadyExists(ref name) if name == "bot"));
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_same_name_creates_admit_exactly_one() {
    let f = fixture().await;
    let (a, b) = tokio::join!(
        f.service.create_agent(&f.ctx, ORG, PROJECT, external_request("racer")),
        f.service.create_agent(&f.ctx, ORG, PROJECT, external_request("racer")),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AgentManagerError::AgentAlreadyExists(_)))));
    assert_eq!(live_agent_count(&f).await, 1);
}

#[tokio::test]
async fn test_concurrent_creates_across_tasks() {
    let f = fixture().await;
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = f.service.clone();
        let ctx = f.ctx.clone();
        handles.push(tokio::spawn(async move {
            service.create_agent(&ctx, ORG, PROJECT, external_request("racer")).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_delete_twice_succeeds() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    f.service.delete_agent(&f.ctx, ORG, PROJECT, "support-bot").await.unwrap();
    f.service.delete_agent(&f.ctx, ORG, PROJECT, "support-bot").await.unwrap();

    assert_eq!(live_agent_count(&f).await, 0);
    assert!(!f.platform.has_component("support-bot"));
    assert_eq!(
        f.platform.calls().iter().filter(|c| **c == "delete_component").count(),
        1
    );
}

#[tokio::test]
async fn test_failed_component_delete_keeps_local_record() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();
    f.platform.fail("delete_component");

    let err = f
        .service
        .delete_agent(&f.ctx, ORG, PROJECT, "support-bot")
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "delete_component", .. }));
    assert_eq!(live_agent_count(&f).await, 1);
}

#[tokio::test]
async fn test_unknown_scope_is_reported() {
    let f = fixture().await;

    let err = f.service.get_agent(&f.ctx, "globex", PROJECT, "bot").await.unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationNotFound(_)));

    let err = f.service.get_agent(&f.ctx, ORG, "missing", "bot").await.unwrap_err();
    assert!(matches!(err, AgentManagerError::ProjectNotFound(_)));

    let err = f.service.get_agent(&f.ctx, ORG, PROJECT, "bot").await.unwrap_err();
    assert!(matches!(err, AgentManagerError::AgentNotFound(_)));
}

#[tokio::test]
async fn test_organizations_are_scoped_to_the_caller() {
    let f = fixture().await;
    let stranger = RequestContext::new(Uuid::new_v4());

    let err = f
        .service
        .list_agents(&stranger, ORG, PROJECT, Page::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationNotFound(_)));
}

#[tokio::test]
async fn test_get_internal_agent_reads_platform_component() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let view = f.service.get_agent(&f.ctx, ORG, PROJECT, "support-bot").await.unwrap();

    assert_eq!(view.status.as_deref(), Some("Active"));
    let repo = view.provisioning.repository.unwrap();
    assert_eq!(repo.url, "https://github.com/acme/bot");
}

#[tokio::test]
async fn test_list_agents_sorts_newest_first_and_paginates() {
    let f = fixture().await;
    for name in ["first", "second", "third"] {
        f.service
            .create_agent(&f.ctx, ORG, PROJECT, external_request(name))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let page = f
        .service
        .list_agents(&f.ctx, ORG, PROJECT, Page { limit: 2, offset: 0 })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let names: Vec<_> = page.items.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["third", "second"]);

    let empty = f
        .service
        .list_agents(&f.ctx, ORG, PROJECT, Page { limit: 2, offset: 3 })
        .await
        .unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.total, 3);
}

#[tokio::test]
async fn test_list_builds_past_the_end_is_empty() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let page = f
        .service
        .list_agent_builds(&f.ctx, ORG, PROJECT, "support-bot", Page { limit: 10, offset: 5 })
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_build_and_deploy_touch_the_agent() {
    let f = fixture().await;
    let created = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let build = f
        .service
        .build_agent(&f.ctx, ORG, PROJECT, "support-bot", "abc123")
        .await
        .unwrap();
    assert_eq!(build.agent_name, "support-bot");

    f.service
        .deploy_agent(
            &f.ctx,
            ORG,
            PROJECT,
            "support-bot",
            &DeployRequest {
                image_id: "registry/bot:abc123".to_string(),
                env: vec![EnvVar::new("LOG_LEVEL", "debug")],
            },
        )
        .await
        .unwrap();

    let rows = f.agents.all_rows().await;
    assert!(rows[0].updated_at > created.updated_at);
    assert_eq!(
        *f.platform.deployed_images.lock().unwrap(),
        vec!["registry/bot:abc123".to_string()]
    );
}

fn deploy_request() -> DeployRequest {
    DeployRequest {
        image_id: "registry/bot:abc123".to_string(),
        env: Vec::new(),
    }
}

async fn stored_updated_at(f: &Fixture) -> chrono::DateTime<Utc> {
    f.agents.all_rows().await[0].updated_at
}

#[tokio::test]
async fn test_build_and_deploy_succeed_when_touch_fails() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();
    let before = stored_updated_at(&f).await;
    f.agent_store.fail("touch");
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let build = f
        .service
        .build_agent(&f.ctx, ORG, PROJECT, "support-bot", "abc123")
        .await
        .unwrap();
    assert_eq!(build.name, "build-1");
    f.service
        .deploy_agent(&f.ctx, ORG, PROJECT, "support-bot", &deploy_request())
        .await
        .unwrap();

    assert_eq!(stored_updated_at(&f).await, before);
    assert_eq!(
        *f.platform.deployed_images.lock().unwrap(),
        vec!["registry/bot:abc123".to_string()]
    );
}

#[tokio::test]
async fn test_failed_build_or_deploy_leaves_timestamp_unchanged() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();
    let before = stored_updated_at(&f).await;
    f.platform.fail("trigger_build");
    f.platform.fail("deploy");
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let err = f
        .service
        .build_agent(&f.ctx, ORG, PROJECT, "support-bot", "abc123")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::Remote { operation: "trigger_build", .. }));
    let err = f
        .service
        .deploy_agent(&f.ctx, ORG, PROJECT, "support-bot", &deploy_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::Remote { operation: "deploy", .. }));

    assert_eq!(stored_updated_at(&f).await, before);
}

#[tokio::test]
async fn test_failed_local_record_compensation_returns_original_error() {
    let f = fixture().await;
    f.platform.fail("setup_deployment");
    f.agent_store.fail("delete_by_name");

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentManagerError::Remote { operation: "setup_deployment", .. }));
    // the component is still removed even though the row could not be
    assert!(!f.platform.has_component("support-bot"));
    assert_eq!(live_agent_count(&f).await, 1);
}

#[tokio::test]
async fn test_create_organization_binds_platform_org() {
    let f = fixture().await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let org = f
        .infra
        .create_organization(
            &f.ctx,
            &CreateOrganizationRequest {
                name: "acme-eu".to_string(),
                platform_org_name: Some(PLATFORM_ORG.to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(org.platform_org_name, PLATFORM_ORG);
    assert_eq!(org.display_name, "Acme Corp");
    assert_eq!(org.status.as_deref(), Some("Ready"));

    let err = f
        .infra
        .create_organization(
            &f.ctx,
            &CreateOrganizationRequest {
                name: "acme-eu".to_string(),
                platform_org_name: Some(PLATFORM_ORG.to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationAlreadyExists(ref n) if n == "acme-eu"));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let orgs = f.infra.list_organizations(&f.ctx, Page::default()).await.unwrap();
    let names: Vec<_> = orgs.items.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec![ORG, "acme-eu"]);
}

#[tokio::test]
async fn test_create_organization_requires_platform_org() {
    let f = fixture().await;

    let err = f
        .infra
        .create_organization(
            &f.ctx,
            &CreateOrganizationRequest {
                name: "globex".to_string(),
                platform_org_name: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationNotFound(ref n) if n == "globex"));

    let err = f.infra.get_organization(&f.ctx, "globex").await.unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationNotFound(_)));
}

#[tokio::test]
async fn test_get_organization_merges_platform_details() {
    let f = fixture().await;

    let org = f.infra.get_organization(&f.ctx, ORG).await.unwrap();
    assert_eq!(org.name, ORG);
    assert_eq!(org.namespace, format!("ns-{}", PLATFORM_ORG));

    let stranger = RequestContext::new(Uuid::new_v4());
    let err = f.infra.get_organization(&stranger, ORG).await.unwrap_err();
    assert!(matches!(err, AgentManagerError::OrganizationNotFound(_)));
}

fn project_request(name: &str) -> CreateProjectRequest {
    CreateProjectRequest {
        name: name.to_string(),
        display_name: "Payments".to_string(),
        description: Some("Billing agents".to_string()),
        deployment_pipeline: None,
    }
}

#[tokio::test]
async fn test_create_project_registers_platform_project() {
    let f = fixture().await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let project = f
        .infra
        .create_project(&f.ctx, ORG, &project_request("payments"))
        .await
        .unwrap();
    assert_eq!(project.org_name, ORG);
    assert_eq!(project.deployment_pipeline.as_deref(), Some("default"));

    let created = f.platform.created_projects.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "payments");
    assert_eq!(created[0].deployment_pipeline, "default");

    let projects = f.infra.list_projects(&f.ctx, ORG, Page::default()).await.unwrap();
    let names: Vec<_> = projects.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["payments", PROJECT]);

    let view = f.infra.get_project(&f.ctx, ORG, "payments").await.unwrap();
    assert_eq!(view.description, "Billing agents");
}

#[tokio::test]
async fn test_duplicate_project_is_conflict() {
    let f = fixture().await;

    let err = f
        .infra
        .create_project(&f.ctx, ORG, &project_request(PROJECT))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::ProjectAlreadyExists(ref n) if n == PROJECT));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(!f.platform.calls().contains(&"create_project"));
}

#[tokio::test]
async fn test_project_names_must_be_canonical() {
    let f = fixture().await;

    let err = f
        .infra
        .create_project(&f.ctx, ORG, &project_request("Payments Team"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn test_failed_platform_project_frees_the_name() {
    let f = fixture().await;
    f.platform.fail("create_project");

    let err = f
        .infra
        .create_project(&f.ctx, ORG, &project_request("payments"))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::Remote { operation: "create_project", .. }));

    let projects = f.infra.list_projects(&f.ctx, ORG, Page::default()).await.unwrap();
    assert_eq!(projects.total, 1);
    let err = f.infra.get_project(&f.ctx, ORG, "payments").await.unwrap_err();
    assert!(matches!(err, AgentManagerError::ProjectNotFound(_)));
}

#[tokio::test]
async fn test_org_environments_come_from_the_platform() {
    let f = fixture_with(MockPlatform {
        environments: vec!["development", "production"],
        ..MockPlatform::new()
    })
    .await;

    let environments = f.infra.get_org_environments(&f.ctx, ORG).await.unwrap();
    let names: Vec<_> = environments.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["development", "production"]);
    assert_eq!(environments[0].namespace, format!("{}-development", PLATFORM_ORG));
}

#[tokio::test]
async fn test_project_pipeline_is_resolved_through_the_project() {
    let f = fixture().await;

    let pipeline = f
        .infra
        .get_project_deployment_pipeline(&f.ctx, ORG, PROJECT)
        .await
        .unwrap();
    assert_eq!(pipeline.name, "default");
    assert_eq!(pipeline.promotion_paths[0].source_environment_ref, "development");
    assert!(pipeline.promotion_paths[0].target_environment_refs[0].requires_approval);
    assert_eq!(f.platform.calls(), vec!["get_project", "get_deployment_pipeline"]);
}

#[tokio::test]
async fn test_unknown_project_pipeline_is_pipeline_not_found() {
    let f = fixture_with(MockPlatform {
        deployment_pipeline: "staged".to_string(),
        ..MockPlatform::new()
    })
    .await;

    let err = f
        .infra
        .get_project_deployment_pipeline(&f.ctx, ORG, PROJECT)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::PipelineNotFound(ref p) if p == "staged"));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_missing_build_is_build_not_found() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let err = f
        .service
        .get_build(&f.ctx, ORG, PROJECT, "support-bot", "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::BuildNotFound(_)));
}

#[tokio::test]
async fn test_build_logs_are_queried_by_build_uuid() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let logs = f
        .service
        .get_build_logs(&f.ctx, ORG, PROJECT, "support-bot", "build-7")
        .await
        .unwrap();
    assert_eq!(logs.total_count, 0);
    assert_eq!(*f.logs.queried_uuids.lock().unwrap(), vec!["uuid-build-7".to_string()]);
}

#[tokio::test]
async fn test_deployments_use_default_pipeline() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let deployments = f
        .service
        .get_agent_deployments(&f.ctx, ORG, PROJECT, "support-bot")
        .await
        .unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(
        f.platform.pipelines.lock().unwrap().last().map(String::as_str),
        Some("default")
    );
}

#[tokio::test]
async fn test_unknown_environment_is_reported_before_querying() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let err = f
        .service
        .get_agent_endpoints(&f.ctx, ORG, PROJECT, "support-bot", "production")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentManagerError::EnvironmentNotFound(ref env) if env == "production"));
    assert!(!f.platform.calls().contains(&"get_endpoints"));

    let endpoints = f
        .service
        .get_agent_endpoints(&f.ctx, ORG, PROJECT, "support-bot", "development")
        .await
        .unwrap();
    assert!(endpoints.contains_key("chat"));
}

#[tokio::test]
async fn test_configurations_hide_system_variables() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap();

    let vars = f
        .service
        .get_agent_configurations(&f.ctx, ORG, PROJECT, "support-bot", "development")
        .await
        .unwrap();
    let keys: Vec<_> = vars.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["OPENAI_MODEL", "LOG_LEVEL"]);
}

#[tokio::test]
async fn test_generate_agent_name_avoids_existing_agents() {
    let f = fixture().await;
    f.service
        .create_agent(&f.ctx, ORG, PROJECT, external_request("my-cool-agent"))
        .await
        .unwrap();

    let name = f
        .service
        .generate_name(
            &f.ctx,
            ORG,
            &ResourceNameRequest {
                display_name: "My Cool Agent!!".to_string(),
                resource_type: ResourceType::Agent,
                project_name: Some(PROJECT.to_string()),
            },
        )
        .await
        .unwrap();

    assert_ne!(name, "my-cool-agent");
    assert!(name.starts_with("my-cool-agent-"));
    assert!(name.len() <= MAX_RESOURCE_NAME_LENGTH);
    let suffix = &name["my-cool-agent-".len()..];
    assert_eq!(suffix.len(), 2);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
}

#[tokio::test]
async fn test_generate_project_name_checks_projects() {
    let f = fixture().await;

    let name = f
        .service
        .generate_name(
            &f.ctx,
            ORG,
            &ResourceNameRequest {
                display_name: "Default".to_string(),
                resource_type: ResourceType::Project,
                project_name: None,
            },
        )
        .await
        .unwrap();
    assert!(name.starts_with("default-"));

    let name = f
        .service
        .generate_name(
            &f.ctx,
            ORG,
            &ResourceNameRequest {
                display_name: "Research Lab".to_string(),
                resource_type: ResourceType::Project,
                project_name: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(name, "research-lab");
}

#[tokio::test]
async fn test_generate_agent_name_requires_project() {
    let f = fixture().await;
    let err = f
        .service
        .generate_name(
            &f.ctx,
            ORG,
            &ResourceNameRequest {
                display_name: "Bot".to_string(),
                resource_type: ResourceType::Agent,
                project_name: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_cancelled_context_aborts_before_any_work() {
    let f = fixture().await;
    f.ctx.cancel();

    let err = f
        .service
        .create_agent(&f.ctx, ORG, PROJECT, internal_request("support-bot"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn test_build_callback_deploys_built_image() {
    let platform = Arc::new(MockPlatform::new());
    platform.components.lock().unwrap().insert("support-bot".to_string());
    let callback = StandardBuildCallbackService::new(platform.clone());
    let ctx = RequestContext::new(Uuid::new_v4());

    callback
        .handle_build_callback(
            &ctx,
            &BuildCompletion {
                image_id: "registry/bot:abc".to_string(),
                agent_name: "support-bot".to_string(),
                project_name: PROJECT.to_string(),
                org_name: PLATFORM_ORG.to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(platform.calls(), vec!["get_project", "get_component", "deploy_built_image"]);
    assert_eq!(*platform.deployed_images.lock().unwrap(), vec!["registry/bot:abc".to_string()]);
}

#[tokio::test]
async fn test_build_callback_for_unknown_component_deploys_nothing() {
    let platform = Arc::new(MockPlatform::new());
    let callback = StandardBuildCallbackService::new(platform.clone());
    let ctx = RequestContext::new(Uuid::new_v4());

    let err = callback
        .handle_build_callback(
            &ctx,
            &BuildCompletion {
                image_id: "registry/bot:abc".to_string(),
                agent_name: "ghost".to_string(),
                project_name: PROJECT.to_string(),
                org_name: PLATFORM_ORG.to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(!platform.calls().contains(&"deploy_built_image"));
}
