// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Manager CLI
//!
//! The `agent-manager` binary runs the agent manager services in-process
//! against the configured store and platform.
//!
//! ## Commands
//!
//! - `agent-manager agent list|get|create|delete|build|deploy` - Agent lifecycle
//! - `agent-manager agent builds|build-logs|deployments|endpoints|configs` - Agent status
//! - `agent-manager org list|get|create|environments` - Organizations
//! - `agent-manager project list|get|create|pipeline` - Projects
//! - `agent-manager name generate` - Derive a free resource name
//! - `agent-manager callback build` - Deploy the image of a finished build
//! - `agent-manager config show|validate|generate` - Configuration management
//! - `agent-manager db migrate|status` - Ledger schema migrations
//!
//! Without `--user`, commands act as the bootstrap user that owns the
//! seeded `default` organization and project.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

use agent_manager_cli::commands::{
    self, AgentCommand, CallbackCommand, ConfigCommand, DbCommand, NameCommand, OrgCommand,
    ProjectCommand,
};
use agent_manager_cli::embedded::{CommandContext, BOOTSTRAP_USER_IDP_ID};
use agent_manager_core::domain::config::ManagerConfig;

/// Agent Manager - provision and operate agents on the platform
#[derive(Parser)]
#[command(name = "agent-manager")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AGENT_MANAGER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "AGENT_MANAGER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Identity-provider id of the acting user (default: the bootstrap user)
    #[arg(long, global = true, env = "AGENT_MANAGER_USER", value_name = "UUID")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent management
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Organization management
    #[command(name = "org")]
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Project management
    #[command(name = "project")]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Resource name generation
    #[command(name = "name")]
    Name {
        #[command(subcommand)]
        command: NameCommand,
    },

    /// Platform callbacks
    #[command(name = "callback")]
    Callback {
        #[command(subcommand)]
        command: CallbackCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Database schema management
    #[command(name = "db")]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = ManagerConfig::load_or_default(cli.config.clone());
    let (level, format) = match &loaded {
        Ok(config) => (
            cli.log_level.clone().unwrap_or_else(|| config.spec.logging.level.clone()),
            config.spec.logging.format.clone(),
        ),
        Err(_) => (
            cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
            "text".to_string(),
        ),
    };
    init_logging(&level, &format)?;

    let user = cli.user.unwrap_or(BOOTSTRAP_USER_IDP_ID);

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Db { command }) => commands::db::handle_command(command, cli.config).await,
        Some(Commands::Agent { command }) => {
            let ctx = CommandContext::new(loaded?, user).await?;
            commands::agent::handle_command(command, &ctx).await
        }
        Some(Commands::Org { command }) => {
            let ctx = CommandContext::new(loaded?, user).await?;
            commands::org::handle_command(command, &ctx).await
        }
        Some(Commands::Project { command }) => {
            let ctx = CommandContext::new(loaded?, user).await?;
            commands::project::handle_command(command, &ctx).await
        }
        Some(Commands::Name { command }) => {
            let ctx = CommandContext::new(loaded?, user).await?;
            commands::name::handle_command(command, &ctx).await
        }
        Some(Commands::Callback { command }) => {
            let ctx = CommandContext::new(loaded?, user).await?;
            commands::callback::handle_command(command, &ctx).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
