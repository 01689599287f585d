// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool and Resilient Executor
//!
//! `Database` wraps the shared `PgPool`. `ResilientExecutor` is the only way
//! repositories reach it: every begin/prepare/execute/query call is retried on
//! transient failure with a linear backoff, bounded by the request deadline
//! and aborted as soon as the request is cancelled.
//!
//! Statements issued inside an open transaction go straight to the
//! transaction and are not retried; only `begin` itself is.
//!
//! [`MIGRATOR`] carries the ledger schema and the seeded default scope.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult, PgStatement};
use sqlx::{Executor, Postgres, Transaction};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::config::DatabaseConfig;
use crate::domain::context::RequestContext;
use crate::domain::repository::RepositoryError;

/// Backoff step used when none is configured.
pub const FALLBACK_BACKOFF_STEP: Duration = Duration::from_millis(200);

/// Ledger schema, embedded from `migrations/` at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub description: String,
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Embedded migrations not yet recorded in `_sqlx_migrations`.
    pub async fn pending_migrations(&self) -> Result<Vec<PendingMigration>> {
        // The bookkeeping table only exists once a migration has run.
        let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM _sqlx_migrations")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_default();

        Ok(MIGRATOR
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .map(|m| PendingMigration {
                version: m.version,
                description: m.description.to_string(),
            })
            .collect())
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!(migrations = MIGRATOR.iter().count(), "Database schema is up to date");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRetryConfig {
    /// Attempts per call, first one included.
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for DbRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl DbRetryConfig {
    /// Wait after the `failed_count`-th failure.
    pub fn backoff(&self, failed_count: u32) -> Duration {
        let step = if self.backoff_step.is_zero() {
            FALLBACK_BACKOFF_STEP
        } else {
            self.backoff_step
        };
        step.saturating_mul(failed_count)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database call cancelled")]
    Cancelled,

    #[error("database call exceeded its deadline")]
    DeadlineExceeded,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<DbError> for RepositoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Cancelled => RepositoryError::Cancelled,
            DbError::DeadlineExceeded => RepositoryError::DeadlineExceeded,
            e if e.is_unique_violation() => RepositoryError::Conflict(e.to_string()),
            DbError::Sqlx(sqlx::Error::RowNotFound) => {
                RepositoryError::NotFound("Row not found".to_string())
            }
            DbError::Sqlx(e) => RepositoryError::Database(e.to_string()),
        }
    }
}

/// Closed set of failures worth another attempt.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        other => is_transient_message(&other.to_string()),
    }
}

pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("is closed")
        || message.contains("connection closed")
        || message.contains("timed out")
        || message.contains("failed to send rpc")
        || message.contains("failed to send remote call")
        || (message.contains("read tcp") && message.contains("i/o timeout"))
}

#[derive(Clone)]
pub struct ResilientExecutor {
    pool: PgPool,
    retry: DbRetryConfig,
    default_timeout: Duration,
}

impl ResilientExecutor {
    pub fn new(database: &Database, retry: DbRetryConfig, default_timeout: Duration) -> Self {
        Self {
            pool: database.get_pool().clone(),
            retry,
            default_timeout,
        }
    }

    pub fn from_config(database: &Database, config: &DatabaseConfig) -> Self {
        Self::new(
            database,
            DbRetryConfig {
                max_attempts: config.max_attempts,
                backoff_step: config.backoff_step,
            },
            config.operation_timeout,
        )
    }

    pub async fn begin(
        &self,
        ctx: &RequestContext,
    ) -> Result<Transaction<'static, Postgres>, DbError> {
        self.run(ctx, "begin", || self.pool.begin()).await
    }

    pub async fn prepare<'q>(
        &self,
        ctx: &RequestContext,
        sql: &'q str,
    ) -> Result<PgStatement<'q>, DbError> {
        self.run(ctx, "prepare", || (&self.pool).prepare(sql)).await
    }

    /// Runs a statement that returns no rows.
    pub async fn execute<'a, F, Fut>(
        &'a self,
        ctx: &RequestContext,
        operation: &'static str,
        mut statement: F,
    ) -> Result<PgQueryResult, DbError>
    where
        F: FnMut(&'a PgPool) -> Fut,
        Fut: Future<Output = Result<PgQueryResult, sqlx::Error>>,
    {
        self.run(ctx, operation, || statement(&self.pool)).await
    }

    /// Runs a query and returns whatever the closure fetches.
    pub async fn query<'a, T, F, Fut>(
        &'a self,
        ctx: &RequestContext,
        operation: &'static str,
        mut query: F,
    ) -> Result<T, DbError>
    where
        F: FnMut(&'a PgPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.run(ctx, operation, || query(&self.pool)).await
    }

    async fn run<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, DbError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let deadline = ctx.deadline_or(self.default_timeout);
        retry_with_backoff(ctx, operation, &self.retry, deadline, &mut attempt).await
    }
}

async fn retry_with_backoff<T, F, Fut>(
    ctx: &RequestContext,
    operation: &'static str,
    retry: &DbRetryConfig,
    deadline: Instant,
    attempt: &mut F,
) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut failed_count = 0u32;
    loop {
        if ctx.is_cancelled() {
            return Err(DbError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => return Err(DbError::Cancelled),
            result = tokio::time::timeout_at(deadline, attempt()) => result,
        };

        let err = match outcome {
            Err(_elapsed) => return Err(DbError::DeadlineExceeded),
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
        };

        failed_count += 1;
        if !is_transient(&err) {
            debug!(operation, error = %err, "Non-transient database error");
            return Err(DbError::Sqlx(err));
        }
        if failed_count >= retry.max_attempts {
            warn!(operation, attempts = failed_count, error = %err, "Database retries exhausted");
            return Err(DbError::Sqlx(err));
        }

        let wait = retry.backoff(failed_count);
        warn!(
            operation,
            attempt = failed_count,
            wait_ms = wait.as_millis() as u64,
            error = %err,
            correlation_id = %ctx.correlation_id,
            "Transient database error, retrying"
        );

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => return Err(DbError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(DbError::DeadlineExceeded),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
