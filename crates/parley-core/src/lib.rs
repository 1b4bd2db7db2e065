// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley.
//!
//! Foundational trait definitions, error types, and common types shared by
//! the relay, the blob store, and the HTTP gateway.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{AdapterType, HealthStatus, StreamEvent};

pub use traits::{AgentClient, AgentStream, BlobStore, EventSink, FrameTransport, PluginAdapter};
