// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Long-lived adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod agent;
pub mod sink;
pub mod storage;

pub use adapter::PluginAdapter;
pub use agent::{AgentClient, AgentStream};
pub use sink::{EventSink, FrameTransport};
pub use storage::BlobStore;
