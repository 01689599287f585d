// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Retry Policy
//!
//! Pure decision logic for outbound platform calls: given the method kind, the
//! failure observed and the attempt number, decide whether to retry and how
//! long to wait first. No I/O and no state beyond configuration.
//!
//! | Method kind | Retryable statuses |
//! |-------------|--------------------|
//! | `Idempotent` (GET, DELETE, HEAD, OPTIONS) | 429, 500, 502, 503, 504 |
//! | `Mutating` (POST, PUT, PATCH) | 429, 502, 503, 504 |
//!
//! A 500 from a mutating call may mean the mutation was partially applied, so
//! it is never replayed. Transport failures are retryable for every method.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const TRANSIENT_STATUS_CODES: [u16; 4] = [429, 502, 503, 504];
pub const TRANSIENT_IDEMPOTENT_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry-relevant semantics of an HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Idempotent,
    Mutating,
}

impl MethodKind {
    pub fn from_method_name(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "DELETE" | "HEAD" | "OPTIONS" => MethodKind::Idempotent,
            _ => MethodKind::Mutating,
        }
    }
}

/// What went wrong on the attempt being judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSignal {
    /// The server answered with a non-2xx status.
    Status(u16),
    /// No usable response: connection refused/reset, attempt timeout, DNS.
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { after: Duration },
    GiveUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(with = "humantime_serde", default = "default_wait_min")]
    pub wait_min: Duration,

    #[serde(with = "humantime_serde", default = "default_wait_max")]
    pub wait_max: Duration,

    /// Retries after the first attempt. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound for a single attempt, independent of the request deadline.
    #[serde(with = "humantime_serde", default = "default_attempt_timeout")]
    pub attempt_timeout: Duration,
}

fn default_wait_min() -> Duration {
    Duration::from_secs(1)
}

fn default_wait_max() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    3
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(180)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait_min: default_wait_min(),
            wait_max: default_wait_max(),
            max_retries: default_max_retries(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable(method: MethodKind, signal: FailureSignal) -> bool {
        match signal {
            FailureSignal::Transport => true,
            FailureSignal::Status(code) => match method {
                MethodKind::Idempotent => TRANSIENT_IDEMPOTENT_STATUS_CODES.contains(&code),
                MethodKind::Mutating => TRANSIENT_STATUS_CODES.contains(&code),
            },
        }
    }

    /// Judge the failure of attempt number `attempt` (1-based).
    pub fn decide(&self, method: MethodKind, signal: FailureSignal, attempt: u32) -> RetryDecision {
        if attempt > self.max_retries || !Self::is_retryable(method, signal) {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            after: self.backoff(attempt),
        }
    }

    /// Exponential backoff `wait_min * 2^(attempt-1)`, capped at `wait_max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.wait_min.saturating_mul(1u32 << exponent);
        delay.min(self.wait_max).max(self.wait_min.min(self.wait_max))
    }
}
