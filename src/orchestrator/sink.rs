//! Output sinks for the chat-turn hook.
//!
//! The host receives two kinds of output: progress [`StatusEvent`]s for its
//! status line and the generated [`StreamChunk`]s in order.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::stream::StreamChunk;

/// Progress notification, shaped like the host's `{"type": "status"}` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub description: String,
    pub done: bool,
}

impl StatusEvent {
    pub fn progress(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: false,
        }
    }

    pub fn done(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: true,
        }
    }

    /// The event as the host's JSON envelope.
    pub fn to_host_json(&self) -> serde_json::Value {
        serde_json::json!({ "type": "status", "data": self })
    }
}

/// Receives the output of one chat turn.
#[async_trait]
pub trait OutputSink: Send {
    async fn status(&mut self, event: StatusEvent);

    async fn chunk(&mut self, chunk: &StreamChunk);
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub statuses: Vec<StatusEvent>,
    pub chunks: Vec<StreamChunk>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.chunks.iter().map(|c| c.delta_text.as_str()).collect()
    }

    pub fn last_status(&self) -> Option<&StatusEvent> {
        self.statuses.last()
    }
}

#[async_trait]
impl OutputSink for CollectingSink {
    async fn status(&mut self, event: StatusEvent) {
        self.statuses.push(event);
    }

    async fn chunk(&mut self, chunk: &StreamChunk) {
        self.chunks.push(chunk.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Status(StatusEvent),
    Chunk(StreamChunk),
}

/// Sink that forwards into a channel, for hosts that consume output on
/// another task. Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SinkEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn status(&mut self, event: StatusEvent) {
        if self.tx.send(SinkEvent::Status(event)).await.is_err() {
            tracing::debug!("status receiver dropped");
        }
    }

    async fn chunk(&mut self, chunk: &StreamChunk) {
        if self.tx.send(SinkEvent::Chunk(chunk.clone())).await.is_err() {
            tracing::debug!("chunk receiver dropped");
        }
    }
}
