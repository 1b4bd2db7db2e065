// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-sink abstraction between the relay and a concrete transport.
//!
//! The relay only ever talks to an [`EventSink`]. Wire framing lives in the
//! sink implementation, which writes raw frames into exactly one
//! [`FrameTransport`].

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RelayError;
use crate::types::StreamEvent;

/// Receives relay events and delivers them to a client.
#[async_trait]
pub trait EventSink: Send {
    /// Emits one event. Emitting after [`close`](EventSink::close) is a no-op.
    ///
    /// Returns [`RelayError::Disconnected`] when the client has gone away.
    async fn emit(&mut self, event: StreamEvent) -> Result<(), RelayError>;

    /// Finalizes the underlying transport. Repeated calls are no-ops.
    async fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Resolves once the client is gone or the sink has been closed.
    ///
    /// Stays pending while the client is connected, so the relay can race it
    /// against upstream work.
    async fn closed(&mut self);
}

/// Raw write capability of a transport (HTTP body, in-memory buffer, ...).
///
/// A single `write` is not assumed to correspond to a single logical event.
#[async_trait]
pub trait FrameTransport: Send {
    async fn write(&mut self, frame: Bytes) -> Result<(), RelayError>;

    /// Ends the transport. Called at most once by a well-behaved sink.
    async fn finish(&mut self);

    /// Resolves when the reading side has gone away.
    async fn closed(&mut self);
}
