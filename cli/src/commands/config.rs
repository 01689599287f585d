// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agent_manager_core::domain::config::{ManagerConfig, StorageKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./agent-manager.yaml)
        #[arg(short, long, default_value = "./agent-manager.yaml")]
        output: PathBuf,

        /// Use in-memory storage instead of PostgreSQL
        #[arg(long)]
        memory: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, memory } => generate(output, memory).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. AGENT_MANAGER_CONFIG_PATH: {}",
            std::env::var("AGENT_MANAGER_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./agent-manager.yaml");
        println!("  4. ~/.agent-manager/config.yaml");
        println!("  5. /etc/agent-manager/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Storage:".bold());
    match config.spec.storage {
        StorageKind::Memory => println!("  Backend: in-memory"),
        StorageKind::Postgres => {
            let db = &config.spec.database;
            println!("  Backend: postgres");
            println!("  Server: {}:{}/{} (user {})", db.host, db.port, db.name, db.user);
            println!(
                "  Retries: {} attempts, {:?} backoff step, {:?} operation timeout",
                db.max_attempts, db.backoff_step, db.operation_timeout
            );
        }
    }
    println!();

    let platform = &config.spec.platform;
    println!("{}", "Platform API:".bold());
    println!("  URL: {}", platform.base_url);
    println!(
        "  Token: {}",
        if platform.token.is_some() { "(set)" } else { "(not set)" }
    );
    println!(
        "  Retry: max {} retries, wait {:?}..{:?}, {:?} per attempt",
        platform.retry.max_retries,
        platform.retry.wait_min,
        platform.retry.wait_max,
        platform.retry.attempt_timeout
    );
    println!();

    println!("{}", "Observer:".bold());
    println!("  URL: {}", config.spec.observer.base_url);
    println!("  Timeout: {:?}", config.spec.observer.timeout);
    println!();

    println!("{}", "Logging:".bold());
    println!(
        "  {} ({})",
        config.spec.logging.level, config.spec.logging.format
    );

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ManagerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, memory: bool) -> Result<()> {
    let mut config = ManagerConfig::default();
    if memory {
        config.spec.storage = StorageKind::Memory;
    }

    config
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
