// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Organization commands
//!
//! Commands: list, get, create, environments

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use agent_manager_core::domain::agent::CreateOrganizationRequest;

use crate::commands::agent::{print_json, PageArgs};
use crate::embedded::{CommandContext, DEFAULT_SCOPE_NAME};

#[derive(Subcommand)]
pub enum OrgCommand {
    /// List organizations of the acting user
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one organization with its platform details
    Get {
        #[arg(value_name = "ORG", default_value = DEFAULT_SCOPE_NAME)]
        name: String,
    },

    /// Bind a local organization name to an existing platform organization
    Create {
        #[arg(value_name = "ORG")]
        name: String,

        /// Platform organization to bind (default: same as ORG)
        #[arg(long)]
        platform_org: Option<String>,
    },

    /// List the environments of an organization
    Environments {
        #[arg(value_name = "ORG", default_value = DEFAULT_SCOPE_NAME)]
        name: String,
    },
}

pub async fn handle_command(command: OrgCommand, ctx: &CommandContext) -> Result<()> {
    let service = ctx.infra.as_ref();
    let req = ctx.request();

    match command {
        OrgCommand::List { page } => {
            let orgs = service.list_organizations(&req, page.into()).await?;
            if orgs.items.is_empty() {
                println!("{}", format!("No organizations found ({} total)", orgs.total).yellow());
                return Ok(());
            }
            println!("{:<26} {:<26} {}", "NAME", "PLATFORM ORG", "CREATED");
            for org in orgs.items {
                println!(
                    "{:<26} {:<26} {}",
                    org.name.bold(),
                    org.platform_org_name,
                    org.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        OrgCommand::Get { name } => {
            let org = service.get_organization(&req, &name).await?;
            print_json(&org)?;
        }
        OrgCommand::Create { name, platform_org } => {
            ctx.require_persistent_ledger("org create")?;
            let request = CreateOrganizationRequest {
                name,
                platform_org_name: platform_org,
            };
            let org = service.create_organization(&req, &request).await?;
            println!(
                "{}",
                format!("✓ Organization {} bound to {}", org.name, org.platform_org_name).green()
            );
        }
        OrgCommand::Environments { name } => {
            let environments = service.get_org_environments(&req, &name).await?;
            println!("{:<20} {:<26} {:<10} {}", "NAME", "DISPLAY NAME", "PROD", "DNS PREFIX");
            for env in environments {
                println!(
                    "{:<20} {:<26} {:<10} {}",
                    env.name.bold(),
                    env.display_name,
                    env.is_production,
                    env.dns_prefix
                );
            }
        }
    }

    Ok(())
}
