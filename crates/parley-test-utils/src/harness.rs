// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end gateway tests.
//!
//! `TestHarness` assembles the gateway over a temp SQLite blob store and,
//! in live mode, a [`MockAgentClient`]. The resulting router can be driven
//! with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use parley_config::model::{RelayConfig, StorageConfig};
use parley_core::{AgentClient, BlobStore, RelayError};
use parley_gateway::{build_router, AgentRelay, GatewayState};
use parley_storage::SqliteBlobStore;

use crate::mock_agent::MockAgentClient;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    mock_mode: bool,
    agent: Option<MockAgentClient>,
    chunk_size: Option<usize>,
    max_upload_bytes: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            mock_mode: true,
            agent: None,
            chunk_size: None,
            max_upload_bytes: None,
        }
    }

    /// Relay through this agent instead of the local mock responder.
    pub fn with_agent(mut self, agent: MockAgentClient) -> Self {
        self.mock_mode = false;
        self.agent = Some(agent);
        self
    }

    /// Override the chunk size so small payloads exercise chunked storage.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = Some(max);
        self
    }

    pub async fn build(self) -> Result<TestHarness, RelayError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| RelayError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let defaults = StorageConfig::default();
        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            max_upload_bytes: self.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            ..defaults
        };
        let max_upload_bytes = storage_config.max_upload_bytes;

        let store = SqliteBlobStore::new(storage_config);
        store.initialize().await?;
        let store: Arc<dyn BlobStore> = Arc::new(store);

        let agent = self.agent.map(Arc::new);
        let client = agent.clone().map(|a| a as Arc<dyn AgentClient>);
        let relay_config = RelayConfig {
            mock_mode: self.mock_mode,
            ..RelayConfig::default()
        };
        let relay = Arc::new(AgentRelay::new(relay_config, client)?);

        let state = GatewayState::new(relay.clone(), store.clone(), max_upload_bytes);
        let router = build_router(state);

        Ok(TestHarness {
            agent,
            relay,
            store,
            router,
            _temp_dir: temp_dir,
        })
    }
}

/// A gateway wired to temp storage and an optional mock agent.
pub struct TestHarness {
    /// The mock agent, present in live mode.
    pub agent: Option<Arc<MockAgentClient>>,
    pub relay: Arc<AgentRelay>,
    /// Blob store over the temp database.
    pub store: Arc<dyn BlobStore>,
    router: Router,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A fresh clone of the gateway router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
