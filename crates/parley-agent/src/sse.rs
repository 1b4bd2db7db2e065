// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for upstream chat streams.
//!
//! Converts the response byte stream into [`AgentChunk`]s using
//! `eventsource-stream`. Payload types this client does not know are skipped.

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use parley_core::types::AgentChunk;
use parley_core::{AgentStream, RelayError};
use tracing::trace;

use crate::types::SsePayload;

/// Sentinel some upstreams send instead of a `done` payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Parse a streaming response into an [`AgentStream`].
pub fn parse_agent_stream(response: reqwest::Response) -> AgentStream {
    let events = response.bytes_stream().eventsource();

    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => parse_data(&event.data),
            Err(e) => Some(Err(RelayError::upstream(format!("SSE stream error: {e}")))),
        }
    });

    Box::pin(mapped)
}

/// Map one `data:` payload; `None` means the event carries nothing to forward.
pub(crate) fn parse_data(data: &str) -> Option<Result<AgentChunk, RelayError>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        return Some(Ok(AgentChunk::Completed));
    }

    match serde_json::from_str::<SsePayload>(data) {
        Ok(SsePayload::Text { text } | SsePayload::Delta { text }) => Some(Ok(AgentChunk::Text(text))),
        Ok(SsePayload::Done) => Some(Ok(AgentChunk::Completed)),
        Ok(SsePayload::Error { message }) => Some(Err(RelayError::upstream(if message.is_empty() {
            "upstream reported an error".to_string()
        } else {
            message
        }))),
        Ok(SsePayload::Unknown) => {
            trace!(data, "skipping unknown upstream event");
            None
        }
        Err(e) => Some(Err(RelayError::UpstreamUnavailable {
            message: format!("failed to parse upstream event: {e}"),
            source: Some(Box::new(e)),
        })),
    }
}
