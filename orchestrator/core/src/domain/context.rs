// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Request Context
//!
//! Explicit per-request state handed to every service, repository and client
//! call: the caller's identity, a correlation id for log stitching, an optional
//! deadline and a cancellation token.
//!
//! Nothing in the crate looks these up from ambient state. A cancelled token or
//! an elapsed deadline aborts in-flight retries and pending backoff waits in
//! both the database executor and the platform HTTP client.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identity-provider id of the calling user (from validated claims).
    pub user_idp_id: Uuid,
    pub correlation_id: String,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(user_idp_id: Uuid) -> Self {
        Self {
            user_idp_id,
            correlation_id: Uuid::new_v4().to_string(),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Ties this context to an externally owned token (e.g. the inbound
    /// connection's shutdown signal).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Same identity and correlation id, fresh cancellation and deadline.
    /// Used for compensating calls that must run after the request itself
    /// was cancelled or timed out.
    pub fn detached(&self, timeout: Duration) -> Self {
        Self {
            user_idp_id: self.user_idp_id,
            correlation_id: self.correlation_id.clone(),
            deadline: Some(Instant::now() + timeout),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The request deadline, or `now + fallback` when the caller set none.
    pub fn deadline_or(&self, fallback: Duration) -> Instant {
        self.deadline.unwrap_or_else(|| Instant::now() + fallback)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Span carrying the request identity; service entry points instrument
    /// their futures with it.
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "request",
            operation,
            correlation_id = %self.correlation_id,
            user = %self.user_idp_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_fallback_applies_only_without_deadline() {
        let ctx = RequestContext::new(Uuid::new_v4());
        assert!(ctx.deadline().is_none());
        let fallback = ctx.deadline_or(Duration::from_secs(30));
        assert!(fallback > Instant::now());

        let explicit = Instant::now() + Duration::from_secs(1);
        let ctx = ctx.with_deadline(explicit);
        assert_eq!(ctx.deadline_or(Duration::from_secs(30)), explicit);
    }

    #[test]
    fn test_clones_share_cancellation() {
        let ctx = RequestContext::new(Uuid::new_v4());
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_detached_context_survives_cancellation() {
        let ctx = RequestContext::new(Uuid::new_v4()).with_correlation_id("req-1");
        ctx.cancel();
        let detached = ctx.detached(Duration::from_secs(5));
        assert!(!detached.is_cancelled());
        assert_eq!(detached.correlation_id, "req-1");
        assert_eq!(detached.user_idp_id, ctx.user_idp_id);
        assert!(detached.deadline().is_some());
    }
}
