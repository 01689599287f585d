// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project commands
//!
//! Commands: list, get, create, pipeline

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use agent_manager_core::domain::agent::CreateProjectRequest;

use crate::commands::agent::{print_json, PageArgs};
use crate::embedded::{CommandContext, DEFAULT_SCOPE_NAME};

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// List projects in an organization, newest first
    List {
        #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
        org: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one project
    Get {
        #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
        org: String,
        #[arg(value_name = "PROJECT")]
        name: String,
    },

    /// Create a project locally and on the platform
    Create {
        #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
        org: String,
        #[arg(value_name = "PROJECT")]
        name: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        description: Option<String>,
        /// Deployment pipeline (default: the platform default pipeline)
        #[arg(long)]
        pipeline: Option<String>,
    },

    /// Show the deployment pipeline a project promotes through
    Pipeline {
        #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
        org: String,
        #[arg(value_name = "PROJECT", default_value = DEFAULT_SCOPE_NAME)]
        name: String,
    },
}

pub async fn handle_command(command: ProjectCommand, ctx: &CommandContext) -> Result<()> {
    let service = ctx.infra.as_ref();
    let req = ctx.request();

    match command {
        ProjectCommand::List { org, page } => {
            let projects = service.list_projects(&req, &org, page.into()).await?;
            if projects.items.is_empty() {
                println!("{}", format!("No projects found ({} total)", projects.total).yellow());
                return Ok(());
            }
            println!("{:<26} {:<30} {}", "NAME", "DISPLAY NAME", "CREATED");
            for project in projects.items {
                println!(
                    "{:<26} {:<30} {}",
                    project.name.bold(),
                    project.display_name,
                    project.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ProjectCommand::Get { org, name } => {
            let project = service.get_project(&req, &org, &name).await?;
            print_json(&project)?;
        }
        ProjectCommand::Create {
            org,
            name,
            display_name,
            description,
            pipeline,
        } => {
            ctx.require_persistent_ledger("project create")?;
            let request = CreateProjectRequest {
                name,
                display_name,
                description,
                deployment_pipeline: pipeline,
            };
            let project = service.create_project(&req, &org, &request).await?;
            println!(
                "{}",
                format!(
                    "✓ Project {} created in {} ({})",
                    project.name,
                    project.org_name,
                    project.deployment_pipeline.unwrap_or_default()
                )
                .green()
            );
        }
        ProjectCommand::Pipeline { org, name } => {
            let pipeline = service
                .get_project_deployment_pipeline(&req, &org, &name)
                .await?;
            println!("{} ({})", pipeline.name.bold(), pipeline.org_name);
            for path in pipeline.promotion_paths {
                let targets: Vec<String> = path
                    .target_environment_refs
                    .iter()
                    .map(|t| {
                        if t.requires_approval {
                            format!("{} (approval)", t.name)
                        } else {
                            t.name.clone()
                        }
                    })
                    .collect();
                println!("  {} -> {}", path.source_environment_ref, targets.join(", "));
            }
        }
    }

    Ok(())
}
