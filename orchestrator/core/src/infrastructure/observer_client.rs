// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Build-log queries against the observer service.

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::domain::context::RequestContext;
use crate::domain::observability::{BuildLogQuery, BuildLogService, BuildLogs};
use crate::domain::platform::PlatformError;
use crate::infrastructure::http::{ApiRequest, ResilientHttpClient};

const BUILD_LOG_LEVEL: &str = "INFO";
const BUILD_LOG_TYPE: &str = "BUILD";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildLogsBody<'a> {
    build_id: &'a str,
    build_uuid: &'a str,
    log_levels: [&'static str; 1],
    log_type: &'static str,
}

pub struct ObserverClient {
    http: ResilientHttpClient,
    base_url: Url,
}

impl ObserverClient {
    pub fn new(base_url: &str, http: ResilientHttpClient) -> Result<Self, PlatformError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            PlatformError::Unavailable(format!("invalid observer URL '{}': {}", base_url, e))
        })?;
        Ok(Self { http, base_url })
    }

    fn logs_url(&self, agent: &str) -> Result<Url, PlatformError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PlatformError::Unavailable(format!(
                    "observer URL '{}' cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "logs", "component", agent]);
        Ok(url)
    }
}

#[async_trait]
impl BuildLogService for ObserverClient {
    async fn get_build_logs(
        &self,
        ctx: &RequestContext,
        query: BuildLogQuery<'_>,
    ) -> Result<BuildLogs, PlatformError> {
        let body = BuildLogsBody {
            build_id: query.build_name,
            build_uuid: query.build_uuid,
            log_levels: [BUILD_LOG_LEVEL],
            log_type: BUILD_LOG_TYPE,
        };
        let request =
            ApiRequest::post("observer.get_build_logs", self.logs_url(query.agent)?).json(&body);
        let logs: BuildLogs = self.http.send_json(ctx, &request).await?;
        tracing::debug!(
            agent = query.agent,
            build = query.build_name,
            entries = logs.logs.len(),
            "Fetched build logs"
        );
        Ok(logs)
    }
}
