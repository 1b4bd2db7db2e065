// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events framing and transports.
//!
//! [`SseStreamAdapter`] turns [`StreamEvent`]s into `data: <json>\n\n` frames
//! and writes them to a single [`FrameTransport`]:
//!
//! ```text
//! data: {"kind":"text","text":"Hel"}
//!
//! data: {"kind":"text","text":"lo"}
//!
//! data: {"kind":"done"}
//! ```

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use parley_core::{EventSink, FrameTransport, RelayError, StreamEvent};
use tokio::sync::mpsc;

/// Frames buffered between the relay task and the HTTP body.
pub const CHANNEL_CAPACITY: usize = 32;

/// Serialize one event as an SSE frame.
pub fn frame(event: &StreamEvent) -> Result<Bytes, RelayError> {
    let json = serde_json::to_string(event)
        .map_err(|e| RelayError::Internal(format!("failed to serialize stream event: {e}")))?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// [`EventSink`] that owns SSE framing over exactly one transport.
pub struct SseStreamAdapter<T: FrameTransport> {
    transport: T,
    closed: bool,
}

impl<T: FrameTransport> SseStreamAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            closed: false,
        }
    }
}

#[async_trait]
impl<T: FrameTransport> EventSink for SseStreamAdapter<T> {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), RelayError> {
        if self.closed {
            return Ok(());
        }
        let bytes = frame(&event)?;
        self.transport.write(bytes).await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transport.finish().await;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn closed(&mut self) {
        if self.closed {
            return;
        }
        self.transport.closed().await;
    }
}

/// Transport feeding a streaming axum response body.
///
/// A dropped body (client gone) makes `write` fail with
/// [`RelayError::Disconnected`]. `finish` drops the sender, which ends the body.
pub struct ChannelTransport {
    tx: Option<mpsc::Sender<Result<Bytes, Infallible>>>,
}

impl ChannelTransport {
    /// Create a transport and the response body it feeds.
    pub fn channel(capacity: usize) -> (Self, Body) {
        let (tx, rx) = mpsc::channel(capacity);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        (Self { tx: Some(tx) }, Body::from_stream(stream))
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn write(&mut self, frame: Bytes) -> Result<(), RelayError> {
        let tx = self.tx.as_ref().ok_or(RelayError::Disconnected)?;
        tx.send(Ok(frame)).await.map_err(|_| RelayError::Disconnected)
    }

    async fn finish(&mut self) {
        self.tx = None;
    }

    async fn closed(&mut self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }
}

/// In-memory transport that records frames, for tests and diagnostics.
///
/// Clones share the same record, so a test can keep one handle while the
/// adapter owns another.
#[derive(Clone, Default)]
pub struct BufferTransport {
    frames: Arc<Mutex<Vec<Bytes>>>,
    finishes: Arc<AtomicUsize>,
    disconnect_after: Option<usize>,
}

impl BufferTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` frames, then behave like a disconnected client.
    pub fn disconnect_after(n: usize) -> Self {
        Self {
            disconnect_after: Some(n),
            ..Self::default()
        }
    }

    /// Raw frames written so far.
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Frames decoded back into events.
    pub fn events(&self) -> Vec<StreamEvent> {
        self.frames()
            .iter()
            .filter_map(|f| std::str::from_utf8(f).ok())
            .filter_map(|f| f.strip_prefix("data: "))
            .filter_map(|f| serde_json::from_str(f.trim_end()).ok())
            .collect()
    }

    /// How many times `finish` has been called.
    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameTransport for BufferTransport {
    async fn write(&mut self, frame: Bytes) -> Result<(), RelayError> {
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| RelayError::Internal("frame buffer poisoned".into()))?;
        if self.disconnect_after.is_some_and(|n| frames.len() >= n) {
            return Err(RelayError::Disconnected);
        }
        frames.push(frame);
        Ok(())
    }

    async fn finish(&mut self) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
    }

    async fn closed(&mut self) {
        let hung_up = match self.disconnect_after {
            Some(n) => self.frames.lock().map_or(true, |f| f.len() >= n),
            None => false,
        };
        if !hung_up {
            std::future::pending::<()>().await;
        }
    }
}
