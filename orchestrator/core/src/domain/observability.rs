// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::context::RequestContext;
use crate::domain::platform::PlatformError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub log: String,
    /// ERROR, WARN, INFO, DEBUG
    #[serde(default)]
    pub log_level: String,
    #[serde(default)]
    pub component_id: String,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub pod_id: String,
    #[serde(default)]
    pub container_name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildLogs {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub total_count: i32,
    #[serde(default)]
    pub took_ms: f32,
}

/// Identifies one build for a log query.
#[derive(Debug, Clone)]
pub struct BuildLogQuery<'a> {
    pub org: &'a str,
    pub project: &'a str,
    pub agent: &'a str,
    pub build_name: &'a str,
    pub build_uuid: &'a str,
}

/// Read-only access to the log/trace query service.
#[async_trait]
pub trait BuildLogService: Send + Sync {
    async fn get_build_logs(
        &self,
        ctx: &RequestContext,
        query: BuildLogQuery<'_>,
    ) -> Result<BuildLogs, PlatformError>;
}
