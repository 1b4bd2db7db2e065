// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the upstream agent API.
//!
//! [`HttpAgentClient`] owns request construction, bearer authentication,
//! transient-error retry and streaming response handling.

use std::time::Duration;

use parley_config::model::AgentConfig;
use parley_core::types::TurnRequest;
use parley_core::{AgentStream, RelayError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, warn};

use crate::sse;
use crate::types::{ApiErrorResponse, ApiMessage, ChatRequest, CreateThreadRequest, CreateThreadResponse};

/// Delay before retrying a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for the agent service's thread and chat endpoints.
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpAgentClient {
    /// Build a client from the `[agent]` configuration section.
    pub fn new(config: &AgentConfig) -> Result<Self, RelayError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RelayError::Config("agent.base_url is not set".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| RelayError::Config(format!("invalid API key header value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::UpstreamUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
        })
    }

    /// The normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST {base}/threads`, returning the allocated thread id.
    pub async fn create_thread(
        &self,
        origin_application: &str,
        agent_id: Option<&str>,
    ) -> Result<String, RelayError> {
        let body = CreateThreadRequest {
            origin_application,
            agent_id,
        };
        let response = self.post_with_retry("threads", &body).await?;
        let parsed: CreateThreadResponse = response.json().await.map_err(|e| {
            RelayError::UpstreamUnavailable {
                message: format!("failed to parse thread response: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        parsed
            .into_thread_id()
            .ok_or_else(|| RelayError::upstream("thread response carried no id"))
    }

    /// `POST {base}/chat` with `stream: true`, returning the parsed fragment stream.
    pub async fn stream_turn(&self, turn: TurnRequest) -> Result<AgentStream, RelayError> {
        let body = ChatRequest {
            thread_id: turn.thread_id,
            parent_message_id: turn.parent_message_id,
            agent_id: turn.agent_id,
            messages: vec![ApiMessage {
                role: turn.message.role,
                content: turn.message.content.into_parts(),
            }],
            stream: true,
        };
        let response = self.post_with_retry("chat", &body).await?;
        Ok(sse::parse_agent_stream(response))
    }

    /// POST `body` to `{base}/{endpoint}`, retrying transient statuses.
    ///
    /// Only the initial response is retried; once a stream is handed out it
    /// is never replayed.
    async fn post_with_retry<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, RelayError> {
        let url = format!("{}/{endpoint}", self.base_url);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, endpoint, "retrying request after transient error");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| RelayError::UpstreamUnavailable {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, endpoint, "upstream response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => match api_err.error.type_ {
                    Some(kind) => format!("agent API error ({kind}): {}", api_err.error.message),
                    None => format!("agent API error: {}", api_err.error.message),
                },
                Err(_) => format!("agent API returned {status}: {body}"),
            };
            return Err(RelayError::upstream(message));
        }

        Err(RelayError::upstream(format!(
            "{endpoint} request failed after retries"
        )))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529)
}
