// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `OrganizationRepository` over the `organizations` table
//! (`id, org_name, platform_org_name, user_idp_id, created_at`).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::agent::{Organization, OrganizationId};
use crate::domain::context::RequestContext;
use crate::domain::repository::{OrganizationRepository, RepositoryError};
use crate::infrastructure::db::ResilientExecutor;

pub struct PostgresOrganizationRepository {
    db: ResilientExecutor,
}

impl PostgresOrganizationRepository {
    pub fn new(db: ResilientExecutor) -> Self {
        Self { db }
    }
}

fn organization_from_row(row: &PgRow) -> Organization {
    Organization {
        id: OrganizationId(row.get::<Uuid, _>("id")),
        name: row.get("org_name"),
        platform_org_name: row.get("platform_org_name"),
        user_idp_id: row.get("user_idp_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
        org_name: &str,
    ) -> Result<Option<Organization>, RepositoryError> {
        let row = self
            .db
            .query(ctx, "organizations.find_by_name", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, org_name, platform_org_name, user_idp_id, created_at
                    FROM organizations
                    WHERE user_idp_id = $1 AND org_name = $2
                    "#,
                )
                .bind(user_idp_id)
                .bind(org_name)
                .fetch_optional(pool)
            })
            .await?;

        Ok(row.as_ref().map(organization_from_row))
    }

    async fn list_for_user(
        &self,
        ctx: &RequestContext,
        user_idp_id: Uuid,
    ) -> Result<Vec<Organization>, RepositoryError> {
        let rows = self
            .db
            .query(ctx, "organizations.list_for_user", |pool| {
                sqlx::query(
                    r#"
                    SELECT id, org_name, platform_org_name, user_idp_id, created_at
                    FROM organizations
                    WHERE user_idp_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(user_idp_id)
                .fetch_all(pool)
            })
            .await?;

        Ok(rows.iter().map(organization_from_row).collect())
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        org: &Organization,
    ) -> Result<(), RepositoryError> {
        self.db
            .execute(ctx, "organizations.create", |pool| {
                sqlx::query(
                    r#"
                    INSERT INTO organizations
                        (id, org_name, platform_org_name, user_idp_id, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(org.id.0)
                .bind(&org.name)
                .bind(&org.platform_org_name)
                .bind(org.user_idp_id)
                .bind(org.created_at)
                .execute(pool)
            })
            .await?;
        Ok(())
    }
}
