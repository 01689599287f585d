// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod http;
pub mod observer_client;
pub mod platform_client;
pub mod repositories;

pub use db::{Database, DbError, DbRetryConfig, ResilientExecutor};
pub use http::{ApiError, ApiRequest, ResilientHttpClient};
pub use observer_client::ObserverClient;
pub use platform_client::PlatformApiClient;
