// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::platform::EnvVar;

/// Name of the organization and project seeded for the bootstrap user.
pub const DEFAULT_SCOPE_NAME: &str = "default";

/// Identity that owns the seeded default organization.
/// Must match the owner of the rows seeded by `migrations/002_default_scope.sql`.
pub const BOOTSTRAP_USER_IDP_ID: Uuid =
    Uuid::from_u128(0x5d1a_f0c3_7e42_4b9e_a6d1_3c8b_20f4_9e17);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Organization name on the orchestration platform.
    pub platform_org_name: String,
    pub user_idp_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub org_id: OrganizationId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub platform_project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Project name on the orchestration platform.
    pub fn platform_name(&self) -> &str {
        self.platform_project.as_deref().unwrap_or(&self.name)
    }
}

/// Fixed at creation. Only `Internal` agents own platform resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Internal,
    External,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Internal => "internal",
            AgentType::External => "external",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "internal" => Some(AgentType::Internal),
            "external" => Some(AgentType::External),
            _ => None,
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local ledger row. The platform never sees this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub org_id: OrganizationId,
    pub project_id: ProjectId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub agent_type: AgentType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(
        org_id: OrganizationId,
        project_id: ProjectId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        agent_type: AgentType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            org_id,
            project_id,
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            agent_type,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.agent_type == AgentType::Internal
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRepository {
    pub url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub app_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioning {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<SourceRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub language: String,
    pub language_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInterface {
    #[serde(rename = "type")]
    pub interface_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provisioning: Provisioning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_configs: Option<RuntimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_interface: Option<InputInterface>,
}

impl CreateAgentRequest {
    pub fn agent_type(&self) -> AgentType {
        self.provisioning.agent_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Agent as presented to callers: local data for external agents, platform
/// component data for internal ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub provisioning: Provisioning,
}

impl AgentView {
    pub fn from_local(agent: &Agent, project_name: &str) -> Self {
        Self {
            name: agent.name.clone(),
            display_name: agent.display_name.clone(),
            description: agent.description.clone(),
            project_name: project_name.to_string(),
            created_at: agent.created_at,
            status: None,
            provisioning: Provisioning {
                agent_type: agent.agent_type,
                repository: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    pub name: String,
    /// Existing platform organization to bind; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_org_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    pub name: String,
    pub platform_org_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrganizationView {
    pub fn from_local(org: &Organization) -> Self {
        Self {
            name: org.name.clone(),
            platform_org_name: org.platform_org_name.clone(),
            display_name: String::new(),
            description: String::new(),
            namespace: String::new(),
            status: None,
            created_at: org.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Platform pipeline the project deploys through; the platform default
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_pipeline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub name: String,
    pub org_name: String,
    pub display_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_pipeline: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn from_local(project: &Project, org_name: &str) -> Self {
        Self {
            name: project.name.clone(),
            org_name: org_name.to_string(),
            display_name: project.display_name.clone(),
            description: project.description.clone(),
            deployment_pipeline: None,
            created_at: project.created_at,
        }
    }
}

/// Resource kinds a name can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Agent,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNameRequest {
    pub display_name: String,
    pub resource_type: ResourceType,
    /// Required when `resource_type` is `Agent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Paginated<T> {
    /// Slices an already ordered result set. An offset at or past the end
    /// yields an empty page that still reports the full total.
    pub fn paginate(all: Vec<T>, page: Page) -> Self {
        let total = all.len();
        if page.offset >= total {
            return Self {
                items: Vec::new(),
                total,
            };
        }
        let end = page.offset.saturating_add(page.limit).min(total);
        let items = all.into_iter().skip(page.offset).take(end - page.offset).collect();
        Self { items, total }
    }
}
