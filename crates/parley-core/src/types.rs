// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Parley services.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Agent,
    Storage,
}

// --- Relay stream types ---

/// One unit of the client-facing event stream.
///
/// A well-formed stream is zero or more `Text` events followed by exactly
/// one terminal event (`Done` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamEvent {
    Text { text: String },
    Done,
    Error { message: String },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// Returns true for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// A typed part of a message body.
///
/// Clients frequently omit `type`; a part with only `text` is treated as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
        }
    }

    fn is_text(&self) -> bool {
        self.kind.as_deref().is_none_or(|k| k == "text")
    }
}

/// Message body: either a bare string or an ordered list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of all text parts, in order.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.is_text())
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Normalizes to the parts representation the upstream API expects.
    pub fn into_parts(self) -> Vec<ContentPart> {
        match self {
            MessageContent::Text(s) => vec![ContentPart::text(s)],
            MessageContent::Parts(parts) => parts,
        }
    }
}

/// A single chat message as sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Everything the upstream agent needs to stream one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// Resolved thread; `None` lets the upstream allocate one.
    pub thread_id: Option<String>,
    /// Id of the previous turn, 0 for a thread's first turn.
    pub parent_message_id: i64,
    pub agent_id: Option<String>,
    /// The single user message of this turn.
    pub message: TurnMessage,
}

/// One item of an upstream agent stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentChunk {
    /// A text fragment, forwarded verbatim.
    Text(String),
    /// The upstream signalled completion.
    Completed,
}

// --- Blob store types ---

/// Caller-supplied metadata for a new upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    /// Uploads may precede conversation creation.
    pub conversation_id: Option<String>,
    pub session_id: String,
    pub filename: String,
    pub mime_type: String,
}

/// Stored metadata for a logical file. Never carries content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub conversation_id: Option<String>,
    pub session_id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: String,
    pub is_chunked: bool,
    /// 0 when the file is stored inline.
    pub chunk_count: i64,
}

/// A single encoded chunk row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    pub file_id: String,
    pub chunk_index: i64,
    pub chunk_content: String,
}
