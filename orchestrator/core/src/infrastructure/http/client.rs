// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::request::ApiRequest;
use crate::domain::context::RequestContext;
use crate::domain::platform::PlatformError;
use crate::domain::retry::{FailureSignal, RetryDecision, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} transport error: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} response could not be decoded: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} request body could not be encoded: {message}")]
    Encode { operation: String, message: String },

    #[error("{operation} cancelled")]
    Cancelled { operation: String },

    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded { operation: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<ApiError> for PlatformError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status {
                operation,
                status,
                body,
            } => PlatformError::Remote {
                operation,
                status,
                body,
            },
            ApiError::Transport { operation, source } => PlatformError::Transport {
                operation,
                message: source.to_string(),
            },
            ApiError::Decode { operation, source } => PlatformError::Decode {
                operation,
                message: source.to_string(),
            },
            ApiError::Encode { operation, message } => PlatformError::Encode { operation, message },
            ApiError::Cancelled { operation } => PlatformError::Cancelled(operation),
            ApiError::DeadlineExceeded { operation } => PlatformError::DeadlineExceeded(operation),
        }
    }
}

/// A 2xx response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP client that applies a [`RetryPolicy`] to every call.
#[derive(Clone)]
pub struct ResilientHttpClient {
    client: Client,
    policy: RetryPolicy,
    bearer_token: Option<String>,
    default_timeout: Duration,
}

impl ResilientHttpClient {
    pub fn new(policy: RetryPolicy, default_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            policy,
            bearer_token: None,
            default_timeout,
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Sends `request` and decodes a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.send(ctx, request).await?;
        serde_json::from_slice(&response.body).map_err(|source| ApiError::Decode {
            operation: request.operation.clone(),
            source,
        })
    }

    /// Sends `request`, ignoring any response body.
    pub async fn send_empty(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
    ) -> Result<(), ApiError> {
        self.send(ctx, request).await.map(|_| ())
    }

    pub async fn send(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let operation = request.operation.as_str();
        let body = match &request.body {
            Some(Err(message)) => {
                return Err(ApiError::Encode {
                    operation: operation.to_string(),
                    message: message.clone(),
                })
            }
            Some(Ok(bytes)) => Some(bytes.clone()),
            None => None,
        };

        let method_kind = request.method_kind();
        let deadline = ctx.deadline_or(self.default_timeout);
        let mut attempt = 0u32;

        loop {
            if ctx.is_cancelled() {
                return Err(ApiError::Cancelled {
                    operation: operation.to_string(),
                });
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => {
                    return Err(ApiError::Cancelled { operation: operation.to_string() });
                }
                result = tokio::time::timeout_at(
                    deadline,
                    self.attempt(ctx, request, body.clone()),
                ) => result,
            };

            let (signal, failure) = match outcome {
                Err(_elapsed) => {
                    return Err(ApiError::DeadlineExceeded {
                        operation: operation.to_string(),
                    })
                }
                Ok(Ok(response)) if (200..300).contains(&response.status) => {
                    debug!(operation, status = response.status, attempt, "Request succeeded");
                    return Ok(response);
                }
                Ok(Ok(response)) => (
                    FailureSignal::Status(response.status),
                    ApiError::Status {
                        operation: operation.to_string(),
                        status: response.status,
                        body: String::from_utf8_lossy(&response.body).into_owned(),
                    },
                ),
                Ok(Err(source)) => (
                    FailureSignal::Transport,
                    ApiError::Transport {
                        operation: operation.to_string(),
                        source,
                    },
                ),
            };

            let wait = match self.policy.decide(method_kind, signal, attempt) {
                RetryDecision::GiveUp => return Err(failure),
                RetryDecision::Retry { after } => after,
            };

            warn!(
                operation,
                attempt,
                wait_ms = wait.as_millis() as u64,
                error = %failure,
                correlation_id = %ctx.correlation_id,
                "Retrying request"
            );

            tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => {
                    return Err(ApiError::Cancelled { operation: operation.to_string() });
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(ApiError::DeadlineExceeded { operation: operation.to_string() });
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(self.policy.attempt_timeout)
            .header("X-Correlation-Id", ctx.correlation_id.as_str());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.header("Content-Type", "application/json").body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}
