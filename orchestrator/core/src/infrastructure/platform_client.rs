// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Platform API Client
//!
//! `PlatformClient` implementation over the platform's REST API. Every call
//! goes through [`ResilientHttpClient`]; responses arrive wrapped in a
//! `{ "data": ... }` envelope.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Map component/build/deployment operations onto HTTP
//! - **Integration:** Agent manager saga → this client → orchestration platform

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::domain::agent::{CreateAgentRequest, DeployRequest, InputInterface, RuntimeConfig};
use crate::domain::context::RequestContext;
use crate::domain::platform::{
    AgentComponent, Build, BuildDetails, ComponentRef, ComponentRepository, Deployment,
    DeploymentPipeline, EndpointDetails, EnvVar, Environment, NewPlatformProject, PlatformClient,
    PlatformError, PlatformOrganization, PlatformProject,
};
use crate::infrastructure::http::{ApiError, ApiRequest, ResilientHttpClient};

pub const AGENT_COMPONENT_TYPE: &str = "agent-component";
pub const BUILDPACK_BUILD_TEMPLATE: &str = "buildpack-ci";
pub const BALLERINA_BUILD_TEMPLATE: &str = "ballerina-buildpack-ci";

const DEFAULT_CPU_REQUEST: &str = "100m";
const DEFAULT_MEMORY_REQUEST: &str = "64Mi";
const DEFAULT_CPU_LIMIT: &str = "400m";
const DEFAULT_MEMORY_LIMIT: &str = "256Mi";

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateComponentBody<'a> {
    name: &'a str,
    display_name: &'a str,
    description: &'a str,
    component_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_config: Option<ComponentRepository>,
    build_template_ref: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<&'a RuntimeConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerBuildBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    commit_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceLimits {
    cpu_request: &'static str,
    memory_request: &'static str,
    cpu_limit: &'static str,
    memory_limit: &'static str,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_request: DEFAULT_CPU_REQUEST,
            memory_request: DEFAULT_MEMORY_REQUEST,
            cpu_limit: DEFAULT_CPU_LIMIT,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupDeploymentBody<'a> {
    deployment_pipeline: &'a str,
    #[serde(skip_serializing_if = "<[EnvVar]>::is_empty")]
    env: &'a [EnvVar],
    #[serde(skip_serializing_if = "Option::is_none")]
    input_interface: Option<&'a InputInterface>,
    resources: ResourceLimits,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployBuiltImageBody<'a> {
    image_id: &'a str,
}

/// Build template for a runtime language.
pub fn build_template_for(runtime: Option<&RuntimeConfig>) -> &'static str {
    match runtime {
        Some(r) if r.language.eq_ignore_ascii_case("ballerina") => BALLERINA_BUILD_TEMPLATE,
        _ => BUILDPACK_BUILD_TEMPLATE,
    }
}

fn not_found_or(err: ApiError, kind: &'static str, name: &str) -> PlatformError {
    if err.is_not_found() {
        PlatformError::NotFound {
            kind,
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

pub struct PlatformApiClient {
    http: ResilientHttpClient,
    base_url: Url,
}

impl PlatformApiClient {
    pub fn new(base_url: &str, http: ResilientHttpClient) -> Result<Self, PlatformError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            PlatformError::Unavailable(format!("invalid platform URL '{}': {}", base_url, e))
        })?;
        Ok(Self { http, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PlatformError::Unavailable(format!(
                    "platform URL '{}' cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "orgs"])
            .extend(segments);
        Ok(url)
    }

    fn project_url(&self, org: &str, project: &str, rest: &[&str]) -> Result<Url, PlatformError> {
        let mut segments = vec![org, "projects", project];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn component_url(
        &self,
        component: ComponentRef<'_>,
        rest: &[&str],
    ) -> Result<Url, PlatformError> {
        let mut segments = vec!["components", component.agent];
        segments.extend_from_slice(rest);
        self.project_url(component.org, component.project, &segments)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.http.send_json(ctx, request).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl PlatformClient for PlatformApiClient {
    async fn get_organization(
        &self,
        ctx: &RequestContext,
        org: &str,
    ) -> Result<PlatformOrganization, PlatformError> {
        let request = ApiRequest::get("platform.get_organization", self.url(&[org])?);
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "organization", org))
    }

    async fn list_environments(
        &self,
        ctx: &RequestContext,
        org: &str,
    ) -> Result<Vec<Environment>, PlatformError> {
        let request =
            ApiRequest::get("platform.list_environments", self.url(&[org, "environments"])?);
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "organization", org))
    }

    async fn create_project(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &NewPlatformProject,
    ) -> Result<(), PlatformError> {
        let request = ApiRequest::post("platform.create_project", self.url(&[org, "projects"])?)
            .json(project);
        self.http.send_empty(ctx, &request).await?;
        info!(org, project = %project.name, "Project created on platform");
        Ok(())
    }

    async fn get_deployment_pipeline(
        &self,
        ctx: &RequestContext,
        org: &str,
        pipeline: &str,
    ) -> Result<DeploymentPipeline, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_deployment_pipeline",
            self.url(&[org, "deployment-pipelines", pipeline])?,
        );
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "deployment pipeline", pipeline))
    }

    async fn get_project(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
    ) -> Result<PlatformProject, PlatformError> {
        let request = ApiRequest::get("platform.get_project", self.project_url(org, project, &[])?);
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "project", project))
    }

    async fn create_component(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
        request: &CreateAgentRequest,
    ) -> Result<(), PlatformError> {
        let runtime = request.runtime_configs.as_ref();
        let body = CreateComponentBody {
            name: &request.name,
            display_name: &request.display_name,
            description: request.description.as_deref().unwrap_or_default(),
            component_type: AGENT_COMPONENT_TYPE,
            build_config: request.provisioning.repository.as_ref().map(|r| ComponentRepository {
                repo_url: r.url.clone(),
                branch: r.branch.clone(),
                app_path: r.app_path.clone(),
            }),
            build_template_ref: build_template_for(runtime),
            runtime,
        };
        let api_request = ApiRequest::post(
            "platform.create_component",
            self.project_url(org, project, &["components"])?,
        )
        .json(&body);

        self.http.send_empty(ctx, &api_request).await?;
        info!(agent = %request.name, org, project, "Component created on platform");
        Ok(())
    }

    async fn delete_component(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<(), PlatformError> {
        let request =
            ApiRequest::delete("platform.delete_component", self.component_url(component, &[])?);
        match self.http.send_empty(ctx, &request).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(agent = component.agent, "Component already absent on platform");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_component(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<AgentComponent, PlatformError> {
        let request =
            ApiRequest::get("platform.get_component", self.component_url(component, &[])?);
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "component", component.agent))
    }

    async fn trigger_build(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        commit_id: &str,
    ) -> Result<Build, PlatformError> {
        let url = self.component_url(component, &["builds"])?;
        let request =
            ApiRequest::post("platform.trigger_build", url).json(&TriggerBuildBody { commit_id });
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "component", component.agent))
    }

    async fn get_build(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        build_name: &str,
    ) -> Result<BuildDetails, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_build",
            self.component_url(component, &["builds", build_name])?,
        );
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "build", build_name))
    }

    async fn list_builds(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<Vec<Build>, PlatformError> {
        let request =
            ApiRequest::get("platform.list_builds", self.component_url(component, &["builds"])?);
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "component", component.agent))
    }

    async fn setup_deployment(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
        pipeline: &str,
        request: &CreateAgentRequest,
    ) -> Result<(), PlatformError> {
        let env = request
            .runtime_configs
            .as_ref()
            .map(|r| r.env.as_slice())
            .unwrap_or_default();
        let body = SetupDeploymentBody {
            deployment_pipeline: pipeline,
            env,
            input_interface: request.input_interface.as_ref(),
            resources: ResourceLimits::default(),
        };
        let component = ComponentRef::new(org, project, &request.name);
        let api_request = ApiRequest::put(
            "platform.setup_deployment",
            self.component_url(component, &["deployment"])?,
        )
        .json(&body);

        self.http.send_empty(ctx, &api_request).await?;
        Ok(())
    }

    async fn deploy(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        request: &DeployRequest,
    ) -> Result<(), PlatformError> {
        let url = self.component_url(component, &["deploy"])?;
        let api_request = ApiRequest::post("platform.deploy", url).json(request);
        self.http
            .send_empty(ctx, &api_request)
            .await
            .map_err(|e| not_found_or(e, "component", component.agent))
    }

    async fn deploy_built_image(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        image_id: &str,
    ) -> Result<(), PlatformError> {
        let api_request = ApiRequest::put(
            "platform.deploy_built_image",
            self.component_url(component, &["workload"])?,
        )
        .json(&DeployBuiltImageBody { image_id });
        self.http
            .send_empty(ctx, &api_request)
            .await
            .map_err(|e| not_found_or(e, "component", component.agent))
    }

    async fn get_deployments(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        pipeline: &str,
    ) -> Result<Vec<Deployment>, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_deployments",
            self.component_url(component, &["deployments"])?,
        )
        .query("pipeline", pipeline);
        self.fetch(ctx, &request).await.map_err(PlatformError::from)
    }

    async fn get_endpoints(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        environment: &str,
    ) -> Result<HashMap<String, EndpointDetails>, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_endpoints",
            self.component_url(component, &["endpoints"])?,
        )
        .query("environment", environment);
        self.fetch(ctx, &request).await.map_err(PlatformError::from)
    }

    async fn get_configurations(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        environment: &str,
    ) -> Result<Vec<EnvVar>, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_configurations",
            self.component_url(component, &["configurations"])?,
        )
        .query("environment", environment);
        self.fetch(ctx, &request).await.map_err(PlatformError::from)
    }

    async fn get_environment(
        &self,
        ctx: &RequestContext,
        org: &str,
        environment: &str,
    ) -> Result<Environment, PlatformError> {
        let request = ApiRequest::get(
            "platform.get_environment",
            self.url(&[org, "environments", environment])?,
        );
        self.fetch(ctx, &request)
            .await
            .map_err(|e| not_found_or(e, "environment", environment))
    }
}
