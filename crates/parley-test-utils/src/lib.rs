// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! - [`MockAgentClient`] - scripted upstream agent that records its calls
//! - [`TestHarness`] - gateway router over a temp blob store
//!
//! Frame capture for the relay lives in `parley_gateway::BufferTransport`;
//! it is re-exported here for convenience.

pub mod harness;
pub mod mock_agent;

pub use harness::TestHarness;
pub use mock_agent::{MockAgentClient, ScriptItem};
pub use parley_gateway::BufferTransport;
