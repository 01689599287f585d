// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the agent manager CLI

pub mod agent;
pub mod callback;
pub mod config;
pub mod db;
pub mod name;
pub mod org;
pub mod project;

pub use self::agent::AgentCommand;
pub use self::callback::CallbackCommand;
pub use self::config::ConfigCommand;
pub use self::db::DbCommand;
pub use self::name::NameCommand;
pub use self::org::OrgCommand;
pub use self::project::ProjectCommand;
