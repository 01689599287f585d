// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Build-completion callback: when the platform reports a finished build,
//! deploy the image it produced. Nothing in the local ledger changes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, Instrument};

use crate::domain::context::RequestContext;
use crate::domain::platform::{ComponentRef, PlatformClient, PlatformError};

/// Payload posted by the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCompletion {
    pub image_id: String,
    pub agent_name: String,
    pub project_name: String,
    pub org_name: String,
}

#[async_trait]
pub trait BuildCallbackService: Send + Sync {
    async fn handle_build_callback(
        &self,
        ctx: &RequestContext,
        completion: &BuildCompletion,
    ) -> Result<(), PlatformError>;
}

pub struct StandardBuildCallbackService {
    platform: Arc<dyn PlatformClient>,
}

impl StandardBuildCallbackService {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    async fn deploy_completed_build(
        &self,
        ctx: &RequestContext,
        completion: &BuildCompletion,
    ) -> Result<(), PlatformError> {
        let org = completion.org_name.as_str();
        self.platform.get_project(ctx, org, &completion.project_name).await?;

        let component = ComponentRef::new(org, &completion.project_name, &completion.agent_name);
        self.platform.get_component(ctx, component).await?;
        self.platform
            .deploy_built_image(ctx, component, &completion.image_id)
            .await
    }
}

#[async_trait]
impl BuildCallbackService for StandardBuildCallbackService {
    async fn handle_build_callback(
        &self,
        ctx: &RequestContext,
        completion: &BuildCompletion,
    ) -> Result<(), PlatformError> {
        let span = ctx.span("build_callback");
        match self.deploy_completed_build(ctx, completion).instrument(span).await {
            Ok(()) => {
                info!(
                    org = %completion.org_name,
                    project = %completion.project_name,
                    agent = %completion.agent_name,
                    image = %completion.image_id,
                    "Built image deployed"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    org = %completion.org_name,
                    project = %completion.project_name,
                    agent = %completion.agent_name,
                    image = %completion.image_id,
                    error = %e,
                    "Failed to deploy built image"
                );
                Err(e)
            }
        }
    }
}
