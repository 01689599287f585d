// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource name commands

use anyhow::Result;
use clap::{Subcommand, ValueEnum};

use agent_manager_core::domain::agent::{ResourceNameRequest, ResourceType};

use crate::embedded::{CommandContext, DEFAULT_SCOPE_NAME};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResourceKind {
    Agent,
    Project,
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Agent => ResourceType::Agent,
            ResourceKind::Project => ResourceType::Project,
        }
    }
}

#[derive(Subcommand)]
pub enum NameCommand {
    /// Derive a name from a display name that is free on the platform and locally
    Generate {
        #[arg(value_name = "DISPLAY_NAME")]
        display_name: String,

        #[arg(long = "type", value_enum, default_value_t = ResourceKind::Agent)]
        resource_type: ResourceKind,

        #[arg(long, env = "AGENT_MANAGER_ORG", default_value = DEFAULT_SCOPE_NAME)]
        org: String,

        /// Project the agent will live in (agents only)
        #[arg(long, env = "AGENT_MANAGER_PROJECT", default_value = DEFAULT_SCOPE_NAME)]
        project: String,
    },
}

pub async fn handle_command(command: NameCommand, ctx: &CommandContext) -> Result<()> {
    match command {
        NameCommand::Generate {
            display_name,
            resource_type,
            org,
            project,
        } => {
            let resource_type = ResourceType::from(resource_type);
            let request = ResourceNameRequest {
                display_name,
                resource_type,
                project_name: match resource_type {
                    ResourceType::Agent => Some(project),
                    ResourceType::Project => None,
                },
            };
            let name = ctx
                .agents
                .generate_name(&ctx.request(), &org, &request)
                .await?;
            println!("{}", name);
        }
    }
    Ok(())
}
