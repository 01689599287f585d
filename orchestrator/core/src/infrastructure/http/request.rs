// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::domain::retry::MethodKind;

impl From<&Method> for MethodKind {
    fn from(method: &Method) -> Self {
        MethodKind::from_method_name(method.as_str())
    }
}

/// One outbound call, described independently of how it is retried.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Human-readable name used in logs and errors (e.g. `platform.create_component`).
    pub operation: String,
    pub method: Method,
    pub url: Url,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Result<Vec<u8>, String>>,
}

impl ApiRequest {
    pub fn new(operation: impl Into<String>, method: Method, url: Url) -> Self {
        Self {
            operation: operation.into(),
            method,
            url,
            query: Vec::new(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn get(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::GET, url)
    }

    pub fn post(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::POST, url)
    }

    pub fn put(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::PUT, url)
    }

    pub fn delete(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Encodes `body` now; an encoding failure is reported by the client
    /// before anything goes on the wire.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_vec(body).map_err(|e| e.to_string()));
        self
    }

    pub fn method_kind(&self) -> MethodKind {
        MethodKind::from(&self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_parts() {
        let url = Url::parse("http://platform.local/api/v1/orgs").unwrap();
        let request = ApiRequest::post("platform.create", url)
            .query("dryRun", "false")
            .header("X-Correlation-Id", "abc")
            .json(&serde_json::json!({"name": "bot"}));

        assert_eq!(request.method_kind(), MethodKind::Mutating);
        assert_eq!(request.query, vec![("dryRun".to_string(), "false".to_string())]);
        assert!(request.headers.iter().any(|(k, _)| k == "X-Correlation-Id"));
        assert_eq!(request.body, Some(Ok(br#"{"name":"bot"}"#.to_vec())));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let url = Url::parse("http://platform.local/x").unwrap();
        assert_eq!(ApiRequest::delete("d", url).method_kind(), MethodKind::Idempotent);
    }
}
