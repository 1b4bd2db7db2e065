// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming relay between a client sink and the upstream agent.
//!
//! A request moves through `Init -> ThreadResolved -> Dispatched -> Streaming
//! -> Terminated`. Input is validated synchronously by [`AgentRelay::prepare`]
//! before any I/O; once [`AgentRelay::run`] starts, every failure is reported
//! in-band as a terminal `error` event and the sink is closed exactly once.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use parley_config::model::RelayConfig;
use parley_core::types::{AgentChunk, TurnMessage, TurnRequest};
use parley_core::{AgentClient, EventSink, RelayError, StreamEvent};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::mock::mock_reply;

/// Per-request relay state, traced at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Init,
    ThreadResolved,
    Dispatched,
    Streaming,
    Terminated,
}

/// How a relayed stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// `done` was emitted.
    Completed,
    /// An `error` event was attempted with this message.
    Failed(String),
    /// The client went away; forwarding stopped.
    Cancelled,
}

/// A request that passed the validation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTurn {
    pub thread_id: Option<String>,
    pub parent_message_id: i64,
    pub message: TurnMessage,
}

/// Bridges one client request to the mock responder or the upstream agent.
pub struct AgentRelay {
    config: RelayConfig,
    client: Option<Arc<dyn AgentClient>>,
}

impl AgentRelay {
    /// Create a relay. Live mode requires an agent client.
    pub fn new(
        config: RelayConfig,
        client: Option<Arc<dyn AgentClient>>,
    ) -> Result<Self, RelayError> {
        if !config.mock_mode && client.is_none() {
            return Err(RelayError::Config(
                "live relay requires an agent client (or set relay.mock_mode)".into(),
            ));
        }
        Ok(Self { config, client })
    }

    pub fn mock_mode(&self) -> bool {
        self.config.mock_mode
    }

    /// Validate a raw chat request body.
    ///
    /// Requires exactly one message with role `user` and `stream: true`.
    /// `parent_message_id` defaults to 0 and accepts integers or numeric
    /// strings; `thread_id` is normalized with [`normalize_thread_id`].
    pub fn prepare(body: &Value) -> Result<PreparedTurn, RelayError> {
        let obj = body
            .as_object()
            .ok_or_else(|| RelayError::Validation("request body must be a JSON object".into()))?;

        let messages = obj
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| RelayError::Validation("`messages` must be an array".into()))?;
        let [message] = messages.as_slice() else {
            return Err(RelayError::Validation(format!(
                "expected exactly one message, got {}",
                messages.len()
            )));
        };
        let message: TurnMessage = serde_json::from_value(message.clone())
            .map_err(|e| RelayError::Validation(format!("invalid message: {e}")))?;
        if message.role != "user" {
            return Err(RelayError::Validation(format!(
                "message role must be `user`, got `{}`",
                message.role
            )));
        }

        if obj.get("stream") != Some(&Value::Bool(true)) {
            return Err(RelayError::Validation(
                "only streaming requests are supported; set `stream: true`".into(),
            ));
        }

        let parent_message_id =
            parse_parent_message_id(obj.get("parent_message_id").or_else(|| obj.get("parentMessageId")))?;
        let thread_id = obj
            .get("thread_id")
            .or_else(|| obj.get("threadId"))
            .and_then(normalize_thread_id);

        Ok(PreparedTurn {
            thread_id,
            parent_message_id,
            message,
        })
    }

    /// Validate and relay in one call.
    pub async fn relay(
        &self,
        body: &Value,
        sink: &mut dyn EventSink,
    ) -> Result<RelayOutcome, RelayError> {
        let turn = Self::prepare(body)?;
        Ok(self.run(turn, sink).await)
    }

    /// Drive a validated turn to its terminal event and close the sink.
    pub async fn run(&self, turn: PreparedTurn, sink: &mut dyn EventSink) -> RelayOutcome {
        trace_state(RelayState::Init);
        let outcome = self.drive(turn, sink).await;
        sink.close().await;
        trace_state(RelayState::Terminated);
        match &outcome {
            RelayOutcome::Completed => debug!("relay completed"),
            RelayOutcome::Failed(message) => warn!(error = %message, "relay failed"),
            RelayOutcome::Cancelled => info!("client disconnected, relay cancelled"),
        }
        outcome
    }

    async fn drive(&self, turn: PreparedTurn, sink: &mut dyn EventSink) -> RelayOutcome {
        let Some(thread_id) = until_closed(sink, self.resolve_thread(turn.thread_id)).await else {
            return RelayOutcome::Cancelled;
        };
        trace_state(RelayState::ThreadResolved);
        debug!(
            thread_id = thread_id.as_deref().unwrap_or(""),
            parent_message_id = turn.parent_message_id,
            mock = self.config.mock_mode,
            "dispatching turn"
        );

        if self.config.mock_mode {
            trace_state(RelayState::Dispatched);
            let reply = mock_reply(&turn.message.content.text());
            trace_state(RelayState::Streaming);
            if let Err(e) = sink.emit(StreamEvent::text(reply)).await {
                return interrupted(sink, e).await;
            }
            return finish(sink).await;
        }

        let Some(client) = self.client.as_ref() else {
            return fail(sink, RelayError::Config("no agent client configured".into())).await;
        };
        let request = TurnRequest {
            thread_id,
            parent_message_id: turn.parent_message_id,
            agent_id: self.config.agent_id.clone(),
            message: turn.message,
        };
        let mut upstream = match until_closed(sink, client.stream_turn(request)).await {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return fail(sink, e).await,
            None => return RelayOutcome::Cancelled,
        };
        trace_state(RelayState::Dispatched);

        trace_state(RelayState::Streaming);
        loop {
            let Some(next) = until_closed(sink, upstream.next()).await else {
                // Dropping the stream releases the upstream call.
                drop(upstream);
                return RelayOutcome::Cancelled;
            };
            match next {
                Some(Ok(AgentChunk::Text(text))) => {
                    if let Err(e) = sink.emit(StreamEvent::text(text)).await {
                        drop(upstream);
                        return interrupted(sink, e).await;
                    }
                }
                Some(Ok(AgentChunk::Completed)) | None => break,
                Some(Err(e)) => return fail(sink, e).await,
            }
        }
        finish(sink).await
    }

    /// Reuse the supplied thread or ask upstream for a new one.
    ///
    /// Creation failure is logged and the turn proceeds without a thread.
    async fn resolve_thread(&self, supplied: Option<String>) -> Option<String> {
        if supplied.is_some() || self.config.mock_mode {
            return supplied;
        }
        let client = self.client.as_ref()?;
        match client
            .create_thread(
                &self.config.origin_application,
                self.config.agent_id.as_deref(),
            )
            .await
        {
            Ok(id) => {
                info!(thread_id = %id, "created thread");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "thread creation failed, continuing without thread id");
                None
            }
        }
    }
}

/// Run `work` unless the client goes away first; `None` means it did.
async fn until_closed<F: Future>(sink: &mut dyn EventSink, work: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = sink.closed() => None,
        output = work => Some(output),
    }
}

fn trace_state(state: RelayState) {
    debug!(state = ?state, "relay state");
}

/// Emit `done`. A disconnect at this point still counts as cancellation.
async fn finish(sink: &mut dyn EventSink) -> RelayOutcome {
    match sink.emit(StreamEvent::Done).await {
        Ok(()) => RelayOutcome::Completed,
        Err(e) => interrupted(sink, e).await,
    }
}

/// A sink write failed mid-stream.
async fn interrupted(sink: &mut dyn EventSink, err: RelayError) -> RelayOutcome {
    match err {
        RelayError::Disconnected => RelayOutcome::Cancelled,
        other => fail(sink, other).await,
    }
}

/// Best-effort terminal `error` event; a failure to deliver it is ignored.
async fn fail(sink: &mut dyn EventSink, err: RelayError) -> RelayOutcome {
    let message = err.to_string();
    if let Err(secondary) = sink.emit(StreamEvent::error(message.clone())).await {
        debug!(error = %secondary, "could not deliver error event");
    }
    RelayOutcome::Failed(message)
}

/// Parse `parent_message_id`: absent or null is 0; integers and numeric
/// strings are accepted.
pub fn parse_parent_message_id(value: Option<&Value>) -> Result<i64, RelayError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            RelayError::Validation(format!("parent_message_id must be an integer, got {n}"))
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
            RelayError::Validation(format!("parent_message_id must be numeric, got `{s}`"))
        }),
        Some(other) => Err(RelayError::Validation(format!(
            "parent_message_id must be numeric, got {other}"
        ))),
    }
}

/// Reduce a client-supplied thread reference to a scalar id.
///
/// Strings pass through (empty is absent), integers become decimal strings,
/// and objects resolve through `thread_id`, `threadId`, then `id`.
pub fn normalize_thread_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        Value::Object(map) => ["thread_id", "threadId", "id"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(normalize_thread_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn thread_id_from_nested_object() {
        assert_eq!(
            normalize_thread_id(&json!({"thread_id": "abc"})).as_deref(),
            Some("abc")
        );
        assert_eq!(
            normalize_thread_id(&json!({"threadId": {"id": 12}})).as_deref(),
            Some("12")
        );
    }

    #[test]
    fn thread_id_key_preference() {
        let value = json!({"id": "third", "threadId": "second", "thread_id": "first"});
        assert_eq!(normalize_thread_id(&value).as_deref(), Some("first"));
        let value = json!({"id": "third", "threadId": "second"});
        assert_eq!(normalize_thread_id(&value).as_deref(), Some("second"));
    }

    #[test]
    fn thread_id_absent_cases() {
        assert_eq!(normalize_thread_id(&json!("")), None);
        assert_eq!(normalize_thread_id(&json!(null)), None);
        assert_eq!(normalize_thread_id(&json!(true)), None);
        assert_eq!(normalize_thread_id(&json!(1.5)), None);
        assert_eq!(normalize_thread_id(&json!(["abc"])), None);
        assert_eq!(normalize_thread_id(&json!({"name": "x"})), None);
    }

    #[test]
    fn thread_id_skips_unusable_keys() {
        let value = json!({"thread_id": "", "id": 7});
        assert_eq!(normalize_thread_id(&value).as_deref(), Some("7"));
    }

    #[test]
    fn parent_message_id_parsing() {
        assert_eq!(parse_parent_message_id(None).unwrap(), 0);
        assert_eq!(parse_parent_message_id(Some(&json!(null))).unwrap(), 0);
        assert_eq!(parse_parent_message_id(Some(&json!(41))).unwrap(), 41);
        assert_eq!(parse_parent_message_id(Some(&json!(" 17 "))).unwrap(), 17);
        assert!(parse_parent_message_id(Some(&json!("abc"))).is_err());
        assert!(parse_parent_message_id(Some(&json!(2.5))).is_err());
        assert!(parse_parent_message_id(Some(&json!({"id": 1}))).is_err());
    }

    #[test]
    fn prepare_accepts_minimal_request() {
        let body = json!({"messages": [{"role": "user", "content": [{"text": "hi"}]}], "stream": true});
        let turn = AgentRelay::prepare(&body).unwrap();
        assert_eq!(turn.thread_id, None);
        assert_eq!(turn.parent_message_id, 0);
        assert_eq!(turn.message.content.text(), "hi");
    }

    #[test]
    fn prepare_normalizes_thread_and_parent() {
        let body = json!({
            "thread_id": {"thread_id": "abc"},
            "parent_message_id": "3",
            "messages": [{"role": "user", "content": "hello"}],
            "stream": true
        });
        let turn = AgentRelay::prepare(&body).unwrap();
        assert_eq!(turn.thread_id.as_deref(), Some("abc"));
        assert_eq!(turn.parent_message_id, 3);
    }

    #[test]
    fn prepare_rejects_bad_shapes() {
        let cases = [
            json!({"messages": [], "stream": true}),
            json!({"messages": [{"role": "user", "content": "a"}], "stream": false}),
            json!({"messages": [{"role": "user", "content": "a"}]}),
            json!({"messages": [{"role": "user", "content": "a"}], "stream": "true"}),
            json!({"messages": [{"role": "assistant", "content": "a"}], "stream": true}),
            json!({"messages": [
                {"role": "user", "content": "a"},
                {"role": "user", "content": "b"}
            ], "stream": true}),
            json!({"messages": [{"role": "user"}], "stream": true}),
            json!({"messages": [{"role": "user", "content": "a"}], "stream": true, "parent_message_id": "x"}),
            json!("not an object"),
        ];
        for body in cases {
            let err = AgentRelay::prepare(&body).unwrap_err();
            assert!(matches!(err, RelayError::Validation(_)), "body {body} gave {err:?}");
        }
    }

    #[test]
    fn live_relay_needs_client() {
        let config = RelayConfig::default();
        assert!(matches!(
            AgentRelay::new(config, None),
            Err(RelayError::Config(_))
        ));
        let mock = RelayConfig {
            mock_mode: true,
            ..RelayConfig::default()
        };
        assert!(AgentRelay::new(mock, None).unwrap().mock_mode());
    }

    #[tokio::test]
    #[traced_test]
    async fn mock_relay_closes_sink_and_logs() {
        use crate::sse::{BufferTransport, SseStreamAdapter};

        let relay = AgentRelay::new(
            RelayConfig {
                mock_mode: true,
                ..RelayConfig::default()
            },
            None,
        )
        .unwrap();
        let transport = BufferTransport::new();
        let mut sink = SseStreamAdapter::new(transport.clone());
        let body = json!({"messages": [{"role": "user", "content": "two words"}], "stream": true});

        let outcome = relay.relay(&body, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Completed);
        assert_eq!(
            transport.events(),
            vec![
                StreamEvent::text("[mock] You said: \"two words\" (2 words)"),
                StreamEvent::Done
            ]
        );
        assert_eq!(transport.finish_count(), 1);
        assert!(logs_contain("relay completed"));
    }
}
