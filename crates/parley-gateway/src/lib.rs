// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Parley.
//!
//! Exposes the streaming chat relay and the file store over axum:
//! - `POST /v1/chat` relays one turn to the agent as server-sent events
//! - `/v1/files` and `/v1/conversations/{id}/files` manage uploads
//! - `GET /health` reports liveness
//!
//! [`relay::AgentRelay`] owns the per-turn state machine. It writes to an
//! [`parley_core::EventSink`], which [`sse::SseStreamAdapter`] frames onto a
//! byte transport.

pub mod handlers;
pub mod mock;
pub mod relay;
pub mod server;
pub mod sse;

pub use relay::{AgentRelay, PreparedTurn, RelayOutcome};
pub use server::{build_router, start_server, GatewayState};
pub use sse::{BufferTransport, ChannelTransport, SseStreamAdapter};
