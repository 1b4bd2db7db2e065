// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent client trait for the managed conversational-agent service.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AgentChunk, TurnRequest};

/// Ordered stream of upstream fragments for one turn.
///
/// Dropping the stream releases the upstream call.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentChunk, RelayError>> + Send>>;

/// Client for the upstream agent service.
#[async_trait]
pub trait AgentClient: PluginAdapter {
    /// Creates a new thread and returns its server-assigned id.
    async fn create_thread(
        &self,
        origin_application: &str,
        agent_id: Option<&str>,
    ) -> Result<String, RelayError>;

    /// Opens the streaming call for a single turn.
    async fn stream_turn(&self, request: TurnRequest) -> Result<AgentStream, RelayError>;
}
