// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_manager;
pub mod build_callback;
pub mod infra_resources;
pub mod saga;

// Re-export use cases for convenience
pub use agent_manager::{
    AgentManagerError, AgentManagerService, ErrorKind, StandardAgentManagerService,
};
pub use build_callback::{BuildCallbackService, BuildCompletion, StandardBuildCallbackService};
pub use infra_resources::{InfraResourceService, StandardInfraResourceService};
pub use saga::{Saga, UnwindReport};
