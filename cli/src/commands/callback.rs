// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Platform callback commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agent_manager_core::application::BuildCompletion;

use crate::embedded::CommandContext;

#[derive(Subcommand)]
pub enum CallbackCommand {
    /// Deploy the image of a finished build
    ///
    /// Names are platform names. Pass either all four flags or a JSON
    /// payload with --payload.
    Build {
        #[arg(long, required_unless_present = "payload")]
        org: Option<String>,

        #[arg(long, required_unless_present = "payload")]
        project: Option<String>,

        #[arg(long, required_unless_present = "payload")]
        agent: Option<String>,

        #[arg(long, required_unless_present = "payload")]
        image: Option<String>,

        /// JSON payload as posted by the build pipeline
        #[arg(long, value_name = "FILE", conflicts_with_all = ["org", "project", "agent", "image"])]
        payload: Option<PathBuf>,
    },
}

pub async fn handle_command(command: CallbackCommand, ctx: &CommandContext) -> Result<()> {
    match command {
        CallbackCommand::Build {
            org,
            project,
            agent,
            image,
            payload,
        } => {
            let completion = match payload {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read payload: {:?}", path))?;
                    serde_json::from_str::<BuildCompletion>(&content)
                        .context("Failed to parse build completion payload")?
                }
                None => BuildCompletion {
                    org_name: org.context("--org is required")?,
                    project_name: project.context("--project is required")?,
                    agent_name: agent.context("--agent is required")?,
                    image_id: image.context("--image is required")?,
                },
            };

            ctx.callbacks
                .handle_build_callback(&ctx.request(), &completion)
                .await
                .context("Build callback failed")?;
            println!(
                "{}",
                format!(
                    "✓ Deployed {} to {}/{}",
                    completion.image_id, completion.project_name, completion.agent_name
                )
                .green()
            );
        }
    }
    Ok(())
}
