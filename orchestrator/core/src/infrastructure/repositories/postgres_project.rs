// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `ProjectRepository` over the `projects` table
//! (`id, name, org_id, platform_project, display_name, description,
//! created_at, updated_at, deleted_at`).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::agent::{OrganizationId, Project, ProjectId};
use crate::domain::context::RequestContext;
use crate::domain::repository::{ProjectRepository, RepositoryError};
use crate::infrastructure::db::{DbError, ResilientExecutor};

pub struct PostgresProjectRepository {
    db: ResilientExecutor,
}

impl PostgresProjectRepository {
    pub fn new(db: ResilientExecutor) -> Self {
        Self { db }
    }
}

fn project_from_row(row: &PgRow) -> Project {
    let display_name: Option<String> = row.get("display_name");
    let description: Option<String> = row.get("description");
    Project {
        id: ProjectId(row.get::<Uuid, _>("id")),
        org_id: OrganizationId(row.get::<Uuid, _>("org_id")),
        name: row.get("name"),
        display_name: display_name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        platform_project: row.get("platform_project"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        let row = self
            .db
            .query(ctx, "projects.find_by_name", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, name, org_id, platform_project, display_name, description,
                           created_at, updated_at, deleted_at
                    FROM projects
                    WHERE org_id = $1 AND name = $2 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_name)
                .fetch_optional(pool)
            })
            .await?;

        Ok(row.as_ref().map(project_from_row))
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
    ) -> Result<Vec<Project>, RepositoryError> {
        let rows = self
            .db
            .query(ctx, "projects.list", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, name, org_id, platform_project, display_name, description,
                           created_at, updated_at, deleted_at
                    FROM projects
                    WHERE org_id = $1 AND deleted_at IS NULL
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(org_id.0)
                .fetch_all(pool)
            })
            .await?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Inserts under a row lock on the owning organization so the name check
    /// and the insert see the same state.
    async fn create(&self, ctx: &RequestContext, project: &Project) -> Result<(), RepositoryError> {
        let mut tx = self.db.begin(ctx).await?;

        let org_exists = sqlx::query("SELECT id FROM organizations WHERE id = $1 FOR UPDATE")
            .bind(project.org_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?
            .is_some();
        if !org_exists {
            return Err(RepositoryError::NotFound(format!("organization {}", project.org_id.0)));
        }

        let taken = sqlx::query(
            "SELECT 1 FROM projects WHERE org_id = $1 AND name = $2 AND deleted_at IS NULL",
        )
            .bind(project.org_id.0)
            .bind(&project.name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?
            .is_some();
        if taken {
            return Err(RepositoryError::Conflict(format!(
                "project '{}' already exists",
                project.name
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, name, org_id, platform_project, display_name, description,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.0)
        .bind(&project.name)
        .bind(project.org_id.0)
        .bind(&project.platform_project)
        .bind(&project.display_name)
        .bind(&project.description)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn delete_by_name(
        &self,
        ctx: &RequestContext,
        org_id: OrganizationId,
        project_name: &str,
    ) -> Result<(), RepositoryError> {
        self.db
            .execute(ctx, "projects.delete_by_name", |pool| {
                sqlx::query(
                    r#"
                    UPDATE projects
                    SET deleted_at = NOW(), updated_at = NOW()
                    WHERE org_id = $1 AND name = $2 AND deleted_at IS NULL
                    "#,
                )
                .bind(org_id.0)
                .bind(project_name)
                .execute(pool)
            })
            .await?;
        Ok(())
    }
}
