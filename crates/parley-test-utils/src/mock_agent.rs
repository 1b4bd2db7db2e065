// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted agent client for deterministic relay tests.
//!
//! `MockAgentClient` implements `AgentClient` without any network access. It
//! replays a fixed script of chunks and records what the relay asked for.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::Mutex;

use parley_core::types::{AdapterType, AgentChunk, HealthStatus, TurnRequest};
use parley_core::{AgentClient, AgentStream, PluginAdapter, RelayError};

/// One scripted stream item. `Err` carries an upstream error message.
pub type ScriptItem = Result<AgentChunk, String>;

/// A mock upstream agent.
///
/// By default `create_thread` returns `"thread-mock"` and `stream_turn` yields
/// a single fragment followed by completion.
pub struct MockAgentClient {
    thread: Result<String, String>,
    script: Vec<ScriptItem>,
    stream_error: Option<String>,
    stall: bool,
    create_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    last_request: Mutex<Option<TurnRequest>>,
    stream_dropped: Arc<AtomicBool>,
}

impl MockAgentClient {
    pub fn new() -> Self {
        Self {
            thread: Ok("thread-mock".to_string()),
            script: vec![
                Ok(AgentChunk::Text("mock reply".to_string())),
                Ok(AgentChunk::Completed),
            ],
            stream_error: None,
            stall: false,
            create_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stream these text fragments, then signal completion.
    pub fn with_fragments(fragments: &[&str]) -> Self {
        let mut script: Vec<ScriptItem> = fragments
            .iter()
            .map(|f| Ok(AgentChunk::Text((*f).to_string())))
            .collect();
        script.push(Ok(AgentChunk::Completed));
        Self::new().with_script(script)
    }

    /// Replace the stream script verbatim.
    pub fn with_script(mut self, script: Vec<ScriptItem>) -> Self {
        self.script = script;
        self
    }

    /// Make `create_thread` return this id.
    pub fn with_thread_id(mut self, id: &str) -> Self {
        self.thread = Ok(id.to_string());
        self
    }

    /// Make `create_thread` fail.
    pub fn failing_thread_creation(mut self, message: &str) -> Self {
        self.thread = Err(message.to_string());
        self
    }

    /// Make `stream_turn` fail before any stream is returned.
    pub fn failing_stream(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// After the script, keep the stream open without producing anything.
    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn create_thread_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn stream_turn_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// The most recent request passed to `stream_turn`.
    pub async fn last_request(&self) -> Option<TurnRequest> {
        self.last_request.lock().await.clone()
    }

    /// True once the last returned stream has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

impl Default for MockAgentClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets its flag when the owning stream is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockAgentClient {
    fn name(&self) -> &str {
        "mock-agent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl AgentClient for MockAgentClient {
    async fn create_thread(
        &self,
        _origin_application: &str,
        _agent_id: Option<&str>,
    ) -> Result<String, RelayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.thread.clone().map_err(RelayError::upstream)
    }

    async fn stream_turn(&self, request: TurnRequest) -> Result<AgentStream, RelayError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(request);
        if let Some(message) = &self.stream_error {
            return Err(RelayError::upstream(message.clone()));
        }

        self.stream_dropped.store(false, Ordering::SeqCst);
        let guard = DropFlag(self.stream_dropped.clone());
        let items = self.script.clone();
        let tail = if self.stall {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        let stream = stream::iter(items).chain(tail).map(move |item| {
            let _held = &guard;
            item.map_err(RelayError::upstream)
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::{MessageContent, TurnMessage};

    fn request() -> TurnRequest {
        TurnRequest {
            thread_id: None,
            parent_message_id: 0,
            agent_id: None,
            message: TurnMessage {
                role: "user".to_string(),
                content: MessageContent::Text("hi".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn replays_fragments_then_completes() {
        let client = MockAgentClient::with_fragments(&["a", "b"]);
        let items: Vec<_> = client
            .stream_turn(request())
            .await
            .unwrap()
            .map(|i| i.unwrap())
            .collect()
            .await;
        assert_eq!(
            items,
            vec![
                AgentChunk::Text("a".into()),
                AgentChunk::Text("b".into()),
                AgentChunk::Completed
            ]
        );
        assert!(client.stream_dropped());
        assert_eq!(client.last_request().await, Some(request()));
    }

    #[tokio::test]
    async fn stalling_stream_yields_script_then_waits() {
        let client = MockAgentClient::with_fragments(&["a"]).stalling();
        let mut stream = client.stream_turn(request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), AgentChunk::Text("a".into()));
        assert_eq!(stream.next().await.unwrap().unwrap(), AgentChunk::Completed);
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), stream.next()).await;
        assert!(waited.is_err());
        drop(stream);
        assert!(client.stream_dropped());
    }

    #[tokio::test]
    async fn thread_creation_is_counted() {
        let client = MockAgentClient::new().failing_thread_creation("nope");
        assert!(client.create_thread("app", None).await.is_err());
        assert_eq!(client.create_thread_calls(), 1);
    }
}
