// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the upstream agent API.

use parley_core::types::ContentPart;
use serde::{Deserialize, Serialize};

/// Body of `POST {base}/threads`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateThreadRequest<'a> {
    pub origin_application: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<&'a str>,
}

/// Response of `POST {base}/threads`. Some deployments answer `{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateThreadResponse {
    #[serde(default)]
    pub thread_id: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl CreateThreadResponse {
    /// The allocated thread id, accepting string or integer encodings.
    pub fn into_thread_id(self) -> Option<String> {
        [self.thread_id, self.id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
                _ => None,
            })
    }
}

/// One message in a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// Body of `POST {base}/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub parent_message_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub messages: Vec<ApiMessage>,
    pub stream: bool,
}

/// `data:` payload of one upstream SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SsePayload {
    Text {
        text: String,
    },
    Delta {
        text: String,
    },
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
    /// Types added by future API versions.
    #[serde(other)]
    Unknown,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_response_prefers_thread_id() {
        let resp: CreateThreadResponse =
            serde_json::from_str(r#"{"thread_id":"t-1","id":"other"}"#).unwrap();
        assert_eq!(resp.into_thread_id().as_deref(), Some("t-1"));
    }

    #[test]
    fn thread_response_falls_back_to_numeric_id() {
        let resp: CreateThreadResponse = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(resp.into_thread_id().as_deref(), Some("42"));
    }

    #[test]
    fn thread_response_without_id() {
        let resp: CreateThreadResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(resp.into_thread_id(), None);
    }

    #[test]
    fn chat_request_omits_absent_thread() {
        let req = ChatRequest {
            thread_id: None,
            parent_message_id: 0,
            agent_id: None,
            messages: vec![ApiMessage {
                role: "user".into(),
                content: vec![ContentPart::text("hi")],
            }],
            stream: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "parent_message_id": 0,
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "stream": true
            })
        );
    }

    #[test]
    fn payload_variants() {
        let text: SsePayload = serde_json::from_str(r#"{"type":"text","text":"a"}"#).unwrap();
        assert_eq!(text, SsePayload::Text { text: "a".into() });
        let unknown: SsePayload = serde_json::from_str(r#"{"type":"usage","tokens":3}"#).unwrap();
        assert_eq!(unknown, SsePayload::Unknown);
        let error: SsePayload = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
        assert_eq!(error, SsePayload::Error { message: String::new() });
    }
}
