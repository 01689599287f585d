// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Database schema commands
//!
//! Applies the embedded ledger migrations, including the seeded default
//! organization and project owned by the bootstrap user.
//!
//! ```bash
//! # Apply all pending migrations
//! agent-manager db migrate
//!
//! # Preview migrations without applying
//! agent-manager db migrate --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agent_manager_core::domain::config::ManagerConfig;
use agent_manager_core::domain::repository::StorageBackend;
use agent_manager_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Subcommand)]
pub enum DbCommand {
    /// Apply pending migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show applied and pending migration counts
    Status,
}

pub async fn handle_command(command: DbCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let connection_string = match config.storage_backend()? {
        StorageBackend::PostgreSQL(pg) => pg.connection_string,
        StorageBackend::InMemory => {
            anyhow::bail!("spec.storage is memory; there is no database to migrate")
        }
    };

    println!("Connecting to database...");
    let database = Database::new(&connection_string, &config.spec.database)
        .await
        .context("Failed to connect to database")?;

    let pending = database
        .pending_migrations()
        .await
        .context("Failed to read migration status")?;
    let total = MIGRATOR.iter().count();
    println!(
        "Migration status: {} applied, {} total available.",
        total - pending.len(),
        total
    );

    match command {
        DbCommand::Status => {
            for migration in &pending {
                println!(
                    " - {} {} {}",
                    "pending".yellow(),
                    migration.version,
                    migration.description
                );
            }
        }
        DbCommand::Migrate { dry_run } => {
            if pending.is_empty() {
                println!("{}", "✓ Database is up to date.".green());
                return Ok(());
            }
            if dry_run {
                println!("Pending migrations found (Dry Run):");
                for migration in &pending {
                    println!(" - {} {}", migration.version, migration.description);
                }
                println!("Skipping application due to --dry-run");
                return Ok(());
            }

            println!("Applying pending migrations...");
            database.migrate().await.context("Failed to apply migrations")?;
            println!("{}", "✓ Database updated successfully.".green());
        }
    }

    Ok(())
}
