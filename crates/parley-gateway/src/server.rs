// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use parley_config::model::ServerConfig;
use parley_core::{BlobStore, RelayError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::relay::AgentRelay;

/// Upper bound on files accepted in one multipart upload.
pub const MAX_FILES_PER_REQUEST: usize = 8;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<AgentRelay>,
    pub store: Arc<dyn BlobStore>,
    /// Per-file upload limit; file parts are never buffered past this + 1.
    pub max_upload_bytes: usize,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(relay: Arc<AgentRelay>, store: Arc<dyn BlobStore>, max_upload_bytes: usize) -> Self {
        Self {
            relay,
            store,
            max_upload_bytes,
            health: HealthState {
                start_time: Instant::now(),
            },
        }
    }
}

/// Build the gateway router.
///
/// The upload route lifts the default body limit: the handler caps each file
/// part at `max_upload_bytes + 1` and reports oversize files per file.
pub fn build_router(state: GatewayState) -> Router {
    let file_routes = Router::new()
        .route("/v1/files", post(handlers::upload_files))
        .layer(DefaultBodyLimit::disable())
        .route(
            "/v1/files/{file_id}",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/v1/files/{file_id}/metadata", get(handlers::get_file_metadata))
        .route(
            "/v1/conversations/{conversation_id}/files",
            get(handlers::list_conversation_files).post(handlers::attach_files),
        )
        .route(
            "/v1/conversations/{conversation_id}/files/count",
            get(handlers::count_conversation_files),
        );

    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/chat", post(handlers::post_chat))
        .merge(file_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until `shutdown` resolves.
pub async fn start_server<F>(
    config: &ServerConfig,
    app: Router,
    shutdown: F,
) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
