// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! `AgentRepository` backed by the `agents` table:
//!
//! ```text
//! agents(id UUID PK, name, display_name, agent_type, description,
//!        project_id, org_id, created_at, updated_at, deleted_at)
//! UNIQUE (name, project_id, org_id) WHERE deleted_at IS NULL
//! ```
//!
//! Deletes are soft: `deleted_at` is stamped and every read filters on it.
//! The partial unique index is what settles concurrent same-name creates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentId, AgentType, OrganizationId, ProjectId};
use crate::domain::context::RequestContext;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::infrastructure::db::ResilientExecutor;

pub struct PostgresAgentRepository {
    db: ResilientExecutor,
}

impl PostgresAgentRepository {
    pub fn new(db: ResilientExecutor) -> Self {
        Self { db }
    }
}

fn agent_from_row(row: &PgRow) -> Result<Agent, RepositoryError> {
    let agent_type_str: String = row.get("agent_type");
    let agent_type = AgentType::parse(&agent_type_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown agent type: {}", agent_type_str))
    })?;
    let description: Option<String> = row.get("description");

    Ok(Agent {
        id: AgentId(row.get::<Uuid, _>("id")),
        org_id: OrganizationId(row.get::<Uuid, _>("org_id")),
        project_id: ProjectId(row.get::<Uuid, _>("project_id")),
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: description.unwrap_or_default(),
        agent_type,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        deleted_at: row.get::<Option<DateTime<Utc>>, _>("deleted_at"),
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<Option<Agent>, RepositoryError> {
        let row = self
            .db
            .query(ctx, "agents.find_by_name", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, name, display_name, agent_type, description,
                           project_id, org_id, created_at, updated_at, deleted_at
                    FROM agents
                    WHERE org_id = $1 AND project_id = $2 AND name = $3 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_id.0)
                .bind(agent_name)
                .fetch_optional(pool)
            })
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
    ) -> Result<Vec<Agent>, RepositoryError> {
        let rows = self
            .db
            .query(ctx, "agents.list", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, name, display_name, agent_type, description,
                           project_id, org_id, created_at, updated_at, deleted_at
                    FROM agents
                    WHERE org_id = $1 AND project_id = $2 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_id.0)
                .fetch_all(pool)
            })
            .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn create(&self, ctx: &RequestContext, agent: &Agent) -> Result<(), RepositoryError> {
        let result = self
            .db
            .execute(ctx, "agents.create", |pool| {
                sqlx::query(
                    r#"
                    INSERT INTO agents (
                        id, name, display_name, agent_type, description,
                        project_id, org_id, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(agent.id.0)
                .bind(&agent.name)
                .bind(&agent.display_name)
                .bind(agent.agent_type.as_str())
                .bind(&agent.description)
                .bind(agent.project_id.0)
                .bind(agent.org_id.0)
                .bind(agent.created_at)
                .bind(agent.updated_at)
                .execute(pool)
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(RepositoryError::Conflict(format!(
                "agent '{}' already exists",
                agent.name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = self
            .db
            .execute(ctx, "agents.delete_by_name", |pool| {
                sqlx::query(
                    r#"
                    UPDATE agents SET deleted_at = NOW()
                    WHERE org_id = $1 AND project_id = $2 AND name = $3 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_id.0)
                .bind(agent_name)
                .execute(pool)
            })
            .await?;

        tracing::debug!(
            agent = agent_name,
            rows = result.rows_affected(),
            "Agent row soft-deleted"
        );
        Ok(())
    }

    async fn touch(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_id: ProjectId,
        agent_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = self
            .db
            .execute(ctx, "agents.touch", |pool| {
                sqlx::query(
                    r#"
                    UPDATE agents SET updated_at = NOW()
                    WHERE org_id = $1 AND project_id = $2 AND name = $3 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_id.0)
                .bind(agent_name)
                .execute(pool)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("agent '{}'", agent_name)));
        }
        Ok(())
    }
}
