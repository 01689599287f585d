// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded service wiring
//!
//! Creates the agent manager services in-process from a [`ManagerConfig`]
//! and hands commands a ready [`RequestContext`].
//!
//! In-memory storage lives only for one invocation. Commands that create or
//! delete platform resources refuse to run against it, since the platform
//! side would outlive the local record.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use agent_manager_core::{
    application::{
        AgentManagerService, BuildCallbackService, InfraResourceService,
        StandardAgentManagerService, StandardBuildCallbackService, StandardInfraResourceService,
    },
    domain::{
        agent::{Organization, OrganizationId, Project, ProjectId},
        config::{ManagerConfig, StorageKind},
        context::RequestContext,
        repository::{
            AgentRepository, OrganizationRepository, ProjectRepository, RepositoryError,
            StorageBackend,
        },
        retry::RetryPolicy,
    },
    infrastructure::{
        db::{Database, ResilientExecutor},
        http::ResilientHttpClient,
        observer_client::ObserverClient,
        platform_client::PlatformApiClient,
        repositories::{
            InMemoryAgentRepository, InMemoryOrganizationRepository, InMemoryProjectRepository,
            PostgresAgentRepository, PostgresOrganizationRepository, PostgresProjectRepository,
        },
    },
};

pub use agent_manager_core::domain::agent::{BOOTSTRAP_USER_IDP_ID, DEFAULT_SCOPE_NAME};

struct Repositories {
    organizations: Arc<dyn OrganizationRepository>,
    projects: Arc<dyn ProjectRepository>,
    agents: Arc<dyn AgentRepository>,
}

pub struct CommandContext {
    pub agents: Arc<dyn AgentManagerService>,
    pub callbacks: Arc<dyn BuildCallbackService>,
    pub infra: Arc<dyn InfraResourceService>,
    storage: StorageKind,
    user: Uuid,
}

impl CommandContext {
    pub async fn new(config: ManagerConfig, user: Uuid) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let platform_http = ResilientHttpClient::new(
            config.spec.platform.retry.clone(),
            config.spec.platform.request_timeout,
        )
        .with_bearer_token(config.spec.platform.resolved_token()?);
        let platform = Arc::new(
            PlatformApiClient::new(&config.spec.platform.base_url, platform_http.clone())
                .context("Failed to create platform client")?,
        );

        let observer_policy = RetryPolicy {
            attempt_timeout: config.spec.observer.timeout,
            ..config.spec.platform.retry.clone()
        };
        let observer_http = ResilientHttpClient::new(observer_policy, config.spec.observer.timeout)
            .with_bearer_token(config.spec.platform.resolved_token()?);
        let observer = Arc::new(
            ObserverClient::new(&config.spec.observer.base_url, observer_http)
                .context("Failed to create observer client")?,
        );

        let repos = Self::repositories(&config, user).await?;

        let infra = Arc::new(StandardInfraResourceService::new(
            repos.organizations.clone(),
            repos.projects.clone(),
            platform.clone(),
        ));
        let agents = Arc::new(StandardAgentManagerService::new(
            repos.organizations,
            repos.projects,
            repos.agents,
            platform.clone(),
            observer,
        ));
        let callbacks = Arc::new(StandardBuildCallbackService::new(platform));

        Ok(Self {
            agents,
            callbacks,
            infra,
            storage: config.spec.storage,
            user,
        })
    }

    async fn repositories(config: &ManagerConfig, user: Uuid) -> Result<Repositories> {
        match config.storage_backend()? {
            StorageBackend::InMemory => {
                info!("Using in-memory storage");
                let organizations = InMemoryOrganizationRepository::new();
                let projects = InMemoryProjectRepository::new();
                seed_default_scope(&organizations, &projects, user)
                    .await
                    .context("Failed to seed default organization")?;
                Ok(Repositories {
                    organizations: Arc::new(organizations),
                    projects: Arc::new(projects),
                    agents: Arc::new(InMemoryAgentRepository::new()),
                })
            }
            StorageBackend::PostgreSQL(pg) => {
                let db_config = &config.spec.database;
                info!(
                    host = %db_config.host,
                    database = %db_config.name,
                    "Connecting to PostgreSQL"
                );
                let database = Database::new(&pg.connection_string, db_config)
                    .await
                    .context("Failed to connect to database")?;
                let executor = ResilientExecutor::from_config(&database, db_config);

                let startup_ctx = RequestContext::new(user);
                executor
                    .prepare(&startup_ctx, "SELECT 1")
                    .await
                    .context("Database readiness check failed")?;
                debug!("Database is ready");

                Ok(Repositories {
                    organizations: Arc::new(PostgresOrganizationRepository::new(executor.clone())),
                    projects: Arc::new(PostgresProjectRepository::new(executor.clone())),
                    agents: Arc::new(PostgresAgentRepository::new(executor)),
                })
            }
        }
    }

    /// Fails for commands that change the ledger or the platform while the
    /// ledger is in-memory.
    pub fn require_persistent_ledger(&self, operation: &str) -> Result<()> {
        ensure_persistent(self.storage, operation)
    }

    /// Fresh request context for one command, cancelled on Ctrl-C.
    pub fn request(&self) -> RequestContext {
        let ctx = RequestContext::new(self.user);
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        ctx
    }
}

fn ensure_persistent(storage: StorageKind, operation: &str) -> Result<()> {
    if storage == StorageKind::Memory {
        anyhow::bail!(
            "{} requires spec.storage: postgres; the in-memory ledger is discarded on exit \
             and would lose track of the platform resources it touches",
            operation
        );
    }
    Ok(())
}

async fn seed_default_scope(
    organizations: &InMemoryOrganizationRepository,
    projects: &InMemoryProjectRepository,
    user: Uuid,
) -> Result<(), RepositoryError> {
    let ctx = RequestContext::new(user);
    let now = Utc::now();
    let org = Organization {
        id: OrganizationId(Uuid::new_v4()),
        name: DEFAULT_SCOPE_NAME.to_string(),
        platform_org_name: DEFAULT_SCOPE_NAME.to_string(),
        user_idp_id: user,
        created_at: now,
    };
    organizations.create(&ctx, &org).await?;
    projects
        .create(
            &ctx,
            &Project {
                id: ProjectId(Uuid::new_v4()),
                org_id: org.id,
                name: DEFAULT_SCOPE_NAME.to_string(),
                display_name: "Default".to_string(),
                description: String::new(),
                platform_project: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        )
        .await
}
