// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resilient outbound HTTP.
//!
//! Every platform and log-service call is an [`ApiRequest`] sent through a
//! [`ResilientHttpClient`], which applies the retry policy, the per-attempt
//! timeout, the request deadline and cancellation in one place.

pub mod client;
pub mod request;

pub use client::{ApiError, ApiResponse, ResilientHttpClient};
pub use request::ApiRequest;
