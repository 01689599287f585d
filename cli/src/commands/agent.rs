// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent commands
//!
//! Commands: list, get, create, delete, build, deploy, builds, build-logs,
//! deployments, endpoints, configs

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use agent_manager_core::domain::agent::{CreateAgentRequest, DeployRequest, Page};
use agent_manager_core::domain::platform::EnvVar;

use crate::embedded::{CommandContext, DEFAULT_SCOPE_NAME};

/// Organization and project an agent lives in.
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    /// Organization name
    #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
    pub org: String,

    /// Project name
    #[arg(long, env = "AGENT_MANAGER_PROJECT", default_value = DEFAULT_SCOPE_NAME)]
    pub project: String,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page {
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List agents in a project
    List {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one agent
    Get {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
    },

    /// Create an agent from a YAML or JSON request file
    Create {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete an agent and its platform component
    Delete {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
    },

    /// Trigger a build
    Build {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        /// Commit to build (default: branch head)
        #[arg(long, default_value = "")]
        commit: String,
    },

    /// Deploy an image
    Deploy {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        #[arg(long)]
        image: String,
        /// Environment variable, repeatable
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
        env: Vec<EnvVar>,
    },

    /// List builds, or show one with --build
    Builds {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        #[arg(long)]
        build: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show the logs of a build
    BuildLogs {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        #[arg(long)]
        build: String,
    },

    /// Show deployments along the project's pipeline
    Deployments {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
    },

    /// Show endpoints in an environment
    Endpoints {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        #[arg(long, default_value = "development")]
        environment: String,
    },

    /// Show user-visible configuration in an environment
    Configs {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(value_name = "AGENT")]
        name: String,
        #[arg(long, default_value = "development")]
        environment: String,
    },
}

pub fn parse_env_var(raw: &str) -> Result<EnvVar, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(EnvVar::new(key.trim(), value)),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub async fn handle_command(command: AgentCommand, ctx: &CommandContext) -> Result<()> {
    let service = ctx.agents.as_ref();
    let req = ctx.request();

    match command {
        AgentCommand::List { scope, page } => {
            let agents = service
                .list_agents(&req, &scope.org, &scope.project, page.into())
                .await?;
            if agents.items.is_empty() {
                println!("{}", format!("No agents found ({} total)", agents.total).yellow());
                return Ok(());
            }
            println!("{} of {} agents:", agents.items.len(), agents.total);
            println!("{:<26} {:<30} {:<10} {}", "NAME", "DISPLAY NAME", "TYPE", "CREATED");
            for agent in agents.items {
                println!(
                    "{:<26} {:<30} {:<10} {}",
                    agent.name.bold(),
                    agent.display_name,
                    agent.provisioning.agent_type,
                    agent.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        AgentCommand::Get { scope, name } => {
            let agent = service.get_agent(&req, &scope.org, &scope.project, &name).await?;
            print_json(&agent)?;
        }
        AgentCommand::Create { scope, file } => {
            ctx.require_persistent_ledger("agent create")?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read request: {:?}", file))?;
            let request: CreateAgentRequest =
                serde_yaml::from_str(&content).context("Failed to parse agent request")?;
            println!("Creating agent: {}", request.name.bold());
            let agent = service
                .create_agent(&req, &scope.org, &scope.project, request)
                .await?;
            println!(
                "{}",
                format!("✓ Agent created: {} ({})", agent.name, agent.agent_type).green()
            );
        }
        AgentCommand::Delete { scope, name } => {
            ctx.require_persistent_ledger("agent delete")?;
            service.delete_agent(&req, &scope.org, &scope.project, &name).await?;
            println!("{}", format!("✓ Agent {} deleted", name).green());
        }
        AgentCommand::Build { scope, name, commit } => {
            ctx.require_persistent_ledger("agent build")?;
            let build = service
                .build_agent(&req, &scope.org, &scope.project, &name, &commit)
                .await?;
            println!(
                "{}",
                format!("✓ Build {} triggered ({})", build.name, build.status).green()
            );
        }
        AgentCommand::Deploy {
            scope,
            name,
            image,
            env,
        } => {
            ctx.require_persistent_ledger("agent deploy")?;
            let request = DeployRequest { image_id: image, env };
            service
                .deploy_agent(&req, &scope.org, &scope.project, &name, &request)
                .await?;
            println!(
                "{}",
                format!("✓ Agent {} deployed with {}", name, request.image_id).green()
            );
        }
        AgentCommand::Builds {
            scope,
            name,
            build: Some(build),
            ..
        } => {
            let details = service
                .get_build(&req, &scope.org, &scope.project, &name, &build)
                .await?;
            print_json(&details)?;
        }
        AgentCommand::Builds {
            scope,
            name,
            build: None,
            page,
        } => {
            let builds = service
                .list_agent_builds(&req, &scope.org, &scope.project, &name, page.into())
                .await?;
            if builds.items.is_empty() {
                println!("{}", format!("No builds found ({} total)", builds.total).yellow());
                return Ok(());
            }
            println!("{:<30} {:<20} {:<12} {}", "BUILD", "STATUS", "COMMIT", "STARTED");
            for build in builds.items {
                println!(
                    "{:<30} {:<20} {:<12} {}",
                    build.name.bold(),
                    build.status,
                    build.commit_id.chars().take(10).collect::<String>(),
                    build.started_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        AgentCommand::BuildLogs { scope, name, build } => {
            let logs = service
                .get_build_logs(&req, &scope.org, &scope.project, &name, &build)
                .await?;
            for entry in logs.logs {
                println!(
                    "{} {:<5} {}",
                    entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
                    entry.log_level,
                    entry.log
                );
            }
        }
        AgentCommand::Deployments { scope, name } => {
            let deployments = service
                .get_agent_deployments(&req, &scope.org, &scope.project, &name)
                .await?;
            for deployment in deployments {
                println!(
                    "{:<20} {:<12} {}",
                    deployment.environment.bold(),
                    deployment.status,
                    deployment.image_id
                );
            }
        }
        AgentCommand::Endpoints {
            scope,
            name,
            environment,
        } => {
            let endpoints = service
                .get_agent_endpoints(&req, &scope.org, &scope.project, &name, &environment)
                .await?;
            for (name, details) in endpoints {
                println!(
                    "{:<20} {:<10} {}",
                    name.bold(),
                    details.endpoint.visibility,
                    details.endpoint.url
                );
            }
        }
        AgentCommand::Configs {
            scope,
            name,
            environment,
        } => {
            let vars = service
                .get_agent_configurations(&req, &scope.org, &scope.project, &name, &environment)
                .await?;
            for var in vars {
                println!("{}={}", var.key.bold(), var.value);
            }
        }
    }

    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
