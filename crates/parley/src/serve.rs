// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve`: wires storage, the agent client and the gateway together.

use std::sync::Arc;

use parley_agent::HttpAgentClient;
use parley_config::ParleyConfig;
use parley_core::{AgentClient, BlobStore, PluginAdapter, RelayError};
use parley_gateway::{build_router, start_server, AgentRelay, GatewayState};
use parley_storage::SqliteBlobStore;
use tracing::{info, warn};

use crate::shutdown;

/// Run the server until SIGINT or SIGTERM.
pub async fn run_serve(config: ParleyConfig) -> Result<(), RelayError> {
    init_tracing(&config.server.log_level);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_mode = config.relay.mock_mode,
        "starting parley"
    );

    let store = SqliteBlobStore::new(config.storage.clone());
    store.initialize().await?;
    info!(path = %config.storage.database_path, "blob store ready");
    let store: Arc<dyn BlobStore> = Arc::new(store);

    let client: Option<Arc<dyn AgentClient>> = if config.relay.mock_mode {
        info!("mock mode enabled, upstream agent disabled");
        None
    } else {
        let client = HttpAgentClient::new(&config.agent)?;
        info!(base_url = %client.base_url(), "agent client configured");
        Some(Arc::new(client) as Arc<dyn AgentClient>)
    };
    let relay = Arc::new(AgentRelay::new(config.relay.clone(), client.clone())?);

    let state = GatewayState::new(relay, store.clone(), config.storage.max_upload_bytes);
    let app = build_router(state);

    let cancel = shutdown::install_signal_handler();
    let result = start_server(&config.server, app, cancel.cancelled_owned()).await;

    if let Some(client) = client
        && let Err(e) = client.shutdown().await
    {
        warn!(error = %e, "agent client shutdown failed");
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "blob store shutdown failed");
    }
    info!("parley stopped");
    result
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
