// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Orchestration Platform Port
//!
//! Boundary to the external platform that owns components, builds and
//! deployments. The platform is a black box; this module only names the
//! operations the agent manager depends on and the read models it gets back.
//!
//! Correlation between a local agent and its remote component is by the
//! `(org, project, agent)` name triple.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{CreateAgentRequest, DeployRequest};
use crate::domain::context::RequestContext;

/// Pipeline used when a platform project names none.
pub const DEFAULT_DEPLOYMENT_PIPELINE: &str = "default";

/// Variables the platform injects into every workload. Hidden from callers.
pub const SYSTEM_ENV_VARS: [&str; 10] = [
    "PYTHONPATH",
    "AMP_TRACELOOP_TRACE_CONTENT",
    "AMP_OTEL_EXPORTER_OTLP_INSECURE",
    "AMP_TRACELOOP_METRICS_ENABLED",
    "AMP_TRACELOOP_TELEMETRY_ENABLED",
    "AMP_OTEL_EXPORTER_OTLP_ENDPOINT",
    "AMP_COMPONENT_ID",
    "AMP_APP_NAME",
    "AMP_APP_VERSION",
    "AMP_ENV",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        SYSTEM_ENV_VARS.contains(&self.key.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRepository {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub app_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentComponent {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "buildConfig")]
    pub repository: ComponentRepository,
    #[serde(default)]
    pub build_template_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub uuid: String,
    pub name: String,
    pub agent_name: String,
    pub project_name: String,
    #[serde(default)]
    pub commit_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    #[serde(rename = "type")]
    pub step_type: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    #[serde(flatten)]
    pub build: Build,
    #[serde(default)]
    pub percent: f32,
    #[serde(default)]
    pub steps: Vec<BuildStep>,
    #[serde(default)]
    pub duration_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visibility: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSchema {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDetails {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub schema: EndpointSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionTarget {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub agent_name: String,
    pub project_name: String,
    #[serde(default)]
    pub image_id: String,
    pub status: String,
    pub environment: String,
    #[serde(default)]
    pub environment_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_target_environment: Option<PromotionTarget>,
    pub last_deployed_at: DateTime<Utc>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_production: bool,
    #[serde(default)]
    pub dns_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformProject {
    pub name: String,
    pub org_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub deployment_pipeline: String,
}

impl PlatformProject {
    pub fn pipeline_or_default(&self) -> &str {
        if self.deployment_pipeline.is_empty() {
            DEFAULT_DEPLOYMENT_PIPELINE
        } else {
            &self.deployment_pipeline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOrganization {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
}

/// Body of a platform project creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlatformProject {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub deployment_pipeline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEnvironmentRef {
    pub name: String,
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPath {
    pub source_environment_ref: String,
    #[serde(default)]
    pub target_environment_refs: Vec<TargetEnvironmentRef>,
}

/// Ordered environments a project's components are promoted through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPipeline {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub promotion_paths: Vec<PromotionPath>,
}

/// Coordinates of a component on the platform.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRef<'a> {
    pub org: &'a str,
    pub project: &'a str,
    pub agent: &'a str,
}

impl<'a> ComponentRef<'a> {
    pub fn new(org: &'a str, project: &'a str, agent: &'a str) -> Self {
        Self { org, project, agent }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{kind} '{name}' not found on the platform")]
    NotFound { kind: &'static str, name: String },

    #[error("{operation} failed with status {status}: {body}")]
    Remote {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} transport failure: {message}")]
    Transport { operation: String, message: String },

    #[error("{operation} returned an undecodable response: {message}")]
    Decode { operation: String, message: String },

    #[error("{operation} request body could not be encoded: {message}")]
    Encode { operation: String, message: String },

    #[error("{0} cancelled")]
    Cancelled(String),

    #[error("{0} exceeded its deadline")]
    DeadlineExceeded(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn get_organization(
        &self,
        ctx: &RequestContext,
        org: &str,
    ) -> Result<PlatformOrganization, PlatformError>;

    async fn list_environments(
        &self,
        ctx: &RequestContext,
        org: &str,
    ) -> Result<Vec<Environment>, PlatformError>;

    async fn create_project(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &NewPlatformProject,
    ) -> Result<(), PlatformError>;

    async fn get_deployment_pipeline(
        &self,
        ctx: &RequestContext,
        org: &str,
        pipeline: &str,
    ) -> Result<DeploymentPipeline, PlatformError>;

    async fn get_project(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
    ) -> Result<PlatformProject, PlatformError>;

    async fn create_component(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
        request: &CreateAgentRequest,
    ) -> Result<(), PlatformError>;

    /// Succeeds when the component is already gone.
    async fn delete_component(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<(), PlatformError>;

    async fn get_component(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<AgentComponent, PlatformError>;

    /// Empty `commit_id` builds the branch head.
    async fn trigger_build(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        commit_id: &str,
    ) -> Result<Build, PlatformError>;

    async fn get_build(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        build_name: &str,
    ) -> Result<BuildDetails, PlatformError>;

    async fn list_builds(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
    ) -> Result<Vec<Build>, PlatformError>;

    async fn setup_deployment(
        &self,
        ctx: &RequestContext,
        org: &str,
        project: &str,
        pipeline: &str,
        request: &CreateAgentRequest,
    ) -> Result<(), PlatformError>;

    async fn deploy(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        request: &DeployRequest,
    ) -> Result<(), PlatformError>;

    /// Promotes the image produced by a finished build.
    async fn deploy_built_image(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        image_id: &str,
    ) -> Result<(), PlatformError>;

    async fn get_deployments(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        pipeline: &str,
    ) -> Result<Vec<Deployment>, PlatformError>;

    async fn get_endpoints(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        environment: &str,
    ) -> Result<HashMap<String, EndpointDetails>, PlatformError>;

    async fn get_configurations(
        &self,
        ctx: &RequestContext,
        component: ComponentRef<'_>,
        environment: &str,
    ) -> Result<Vec<EnvVar>, PlatformError>;

    async fn get_environment(
        &self,
        ctx: &RequestContext,
        org: &str,
        environment: &str,
    ) -> Result<Environment, PlatformError>;
}

/// Drops platform-injected variables, preserving order.
pub fn filter_system_env_vars(vars: Vec<EnvVar>) -> Vec<EnvVar> {
    vars.into_iter().filter(|v| !v.is_system()).collect()
}
