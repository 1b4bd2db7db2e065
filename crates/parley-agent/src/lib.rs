// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream agent adapter for Parley.
//!
//! Implements [`AgentClient`] over the agent service's HTTP API: thread
//! creation and streamed chat turns delivered as server-sent events.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use parley_core::types::{AdapterType, HealthStatus, TurnRequest};
use parley_core::{AgentClient, AgentStream, PluginAdapter, RelayError};
use tracing::debug;

pub use client::HttpAgentClient;

#[async_trait]
impl PluginAdapter for HttpAgentClient {
    fn name(&self) -> &str {
        "http-agent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn create_thread(
        &self,
        origin_application: &str,
        agent_id: Option<&str>,
    ) -> Result<String, RelayError> {
        let thread_id = HttpAgentClient::create_thread(self, origin_application, agent_id).await?;
        debug!(thread_id = %thread_id, "thread created");
        Ok(thread_id)
    }

    async fn stream_turn(&self, request: TurnRequest) -> Result<AgentStream, RelayError> {
        HttpAgentClient::stream_turn(self, request).await
    }
}
