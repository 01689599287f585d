// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: ledger aggregates, ports to the platform and log service,
//! the retry policy and the name generator. No I/O lives here.

pub mod agent;
pub mod config;
pub mod context;
pub mod naming;
pub mod observability;
pub mod platform;
pub mod repository;
pub mod retry;
