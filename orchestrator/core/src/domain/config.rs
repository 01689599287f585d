// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manager Configuration Types
//!
//! Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
//! - the local relational store and its retry/timeout envelope
//! - the orchestration platform endpoint and outbound retry policy
//! - the build-log query service
//! - logging

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::retry::RetryPolicy;

pub const API_VERSION: &str = "agent-manager/v1";
pub const KIND: &str = "ManagerConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// API version (must be "agent-manager/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ManagerConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ManagerConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfigSpec {
    #[serde(default)]
    pub storage: StorageKind,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub observer: ObserverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "default_db_name")]
    pub name: String,

    /// Password (supports "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Attempt ceiling per statement, first attempt included.
    #[serde(default = "default_db_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit: the n-th failure waits `n * backoff_step`.
    #[serde(with = "humantime_serde", default = "default_backoff_step")]
    pub backoff_step: Duration,

    /// Applied when the request carries no deadline.
    #[serde(with = "humantime_serde", default = "default_operation_timeout")]
    pub operation_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_url")]
    pub base_url: String,

    /// Bearer token (supports "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Applied when the request carries no deadline.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default = "default_observer_url")]
    pub base_url: String,

    #[serde(with = "humantime_serde", default = "default_observer_timeout")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "agentmanager".to_string()
}

fn default_db_name() -> String {
    "agentmanager".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_db_max_attempts() -> u32 {
    3
}

fn default_backoff_step() -> Duration {
    Duration::from_secs(5)
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_platform_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_observer_url() -> String {
    "http://localhost:9097".to_string()
}

fn default_observer_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            name: default_db_name(),
            password: None,
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
            max_attempts: default_db_max_attempts(),
            backoff_step: default_backoff_step(),
            operation_timeout: default_operation_timeout(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_platform_url(),
            token: None,
            retry: RetryPolicy::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            base_url: default_observer_url(),
            timeout: default_observer_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ManagerConfigSpec {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            database: DatabaseConfig::default(),
            platform: PlatformConfig::default(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "agent-manager".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ManagerConfigSpec::default(),
        }
    }
}

/// Resolves "env:VAR_NAME" indirection; plain values pass through.
pub fn resolve_secret(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
        None => Ok(value.to_string()),
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> anyhow::Result<String> {
        let password = match &self.password {
            Some(p) => resolve_secret(p)?,
            None => String::new(),
        };
        let credentials = if password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, password)
        };
        Ok(format!(
            "postgres://{}@{}:{}/{}",
            credentials, self.host, self.port, self.name
        ))
    }
}

impl PlatformConfig {
    pub fn resolved_token(&self) -> anyhow::Result<Option<String>> {
        self.token.as_deref().map(resolve_secret).transpose()
    }
}

impl ManagerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. AGENT_MANAGER_CONFIG_PATH environment variable
    /// 2. ./agent-manager.yaml (working directory)
    /// 3. ~/.agent-manager/config.yaml (user home)
    /// 4. /etc/agent-manager/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AGENT_MANAGER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./agent-manager.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agent-manager").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/agent-manager/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.spec.database;
        if let Some(val) = lookup("AGENT_MANAGER_DB_HOST") {
            tracing::info!("Environment override: AGENT_MANAGER_DB_HOST={}", val);
            db.host = val;
        }
        if let Some(val) = lookup("AGENT_MANAGER_DB_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: AGENT_MANAGER_DB_PORT={}", port);
                    db.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for AGENT_MANAGER_DB_PORT: '{}'. \
                         Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
        if let Some(val) = lookup("AGENT_MANAGER_DB_USER") {
            tracing::info!("Environment override: AGENT_MANAGER_DB_USER={}", val);
            db.user = val;
        }
        if let Some(val) = lookup("AGENT_MANAGER_DB_NAME") {
            tracing::info!("Environment override: AGENT_MANAGER_DB_NAME={}", val);
            db.name = val;
        }
        if let Some(val) = lookup("AGENT_MANAGER_DB_PASSWORD") {
            tracing::info!("Environment override: AGENT_MANAGER_DB_PASSWORD=<redacted>");
            db.password = Some(val);
        }
        if let Some(val) = lookup("AGENT_MANAGER_PLATFORM_URL") {
            tracing::info!("Environment override: AGENT_MANAGER_PLATFORM_URL={}", val);
            self.spec.platform.base_url = val;
        }
        if let Some(val) = lookup("AGENT_MANAGER_PLATFORM_TOKEN") {
            tracing::info!("Environment override: AGENT_MANAGER_PLATFORM_TOKEN=<redacted>");
            self.spec.platform.token = Some(val);
        }
        if let Some(val) = lookup("AGENT_MANAGER_OBSERVER_URL") {
            tracing::info!("Environment override: AGENT_MANAGER_OBSERVER_URL={}", val);
            self.spec.observer.base_url = val;
        }
        if let Some(val) = lookup("AGENT_MANAGER_LOG_LEVEL") {
            self.spec.logging.level = val;
        }
    }

    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        Ok(match self.spec.storage {
            StorageKind::Memory => StorageBackend::InMemory,
            StorageKind::Postgres => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: self.spec.database.connection_string()?,
            }),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let platform = &self.spec.platform;
        if platform.base_url.trim().is_empty() {
            anyhow::bail!("spec.platform.base_url cannot be empty");
        }
        url::Url::parse(&platform.base_url)
            .map_err(|e| anyhow::anyhow!("spec.platform.base_url is not a valid URL: {}", e))?;

        if platform.retry.wait_min > platform.retry.wait_max {
            anyhow::bail!(
                "spec.platform.retry.wait_min ({:?}) exceeds wait_max ({:?})",
                platform.retry.wait_min,
                platform.retry.wait_max
            );
        }

        if self.spec.observer.base_url.trim().is_empty() {
            anyhow::bail!("spec.observer.base_url cannot be empty");
        }

        if self.spec.storage == StorageKind::Postgres {
            let db = &self.spec.database;
            if db.host.is_empty() {
                anyhow::bail!("spec.database.host cannot be empty");
            }
            if db.user.is_empty() {
                anyhow::bail!("spec.database.user cannot be empty");
            }
            if db.name.is_empty() {
                anyhow::bail!("spec.database.name cannot be empty");
            }
        }

        if self.spec.database.max_attempts == 0 {
            anyhow::bail!("spec.database.max_attempts must be at least 1");
        }

        match self.spec.logging.format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("Invalid logging format: '{}'. Must be 'json' or 'text'", other),
        }

        Ok(())
    }
}
