// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Manager Core
//!
//! Provisioning, lifecycle and naming of agents inside organization/project
//! scopes, with a resilient call layer in front of the deployment platform
//! and the metadata database.
//!
//! # Architecture
//!
//! - **domain:** entities, retry policy, name allocation, repository and
//!   platform traits
//! - **application:** the agent manager service, its provisioning saga and
//!   the build-completion callback
//! - **infrastructure:** PostgreSQL repositories over the resilient executor,
//!   the resilient HTTP client and the platform/observer clients

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
