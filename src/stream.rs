//! Streaming types
//!
//! A generation is delivered as a [`ChunkStream`]: a lazy, finite,
//! non-restartable sequence of [`StreamChunk`]s in generation order. Exactly
//! one chunk, the last, has `is_final = true`.

use crate::error::VideoError;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Safety,
    Error,
}

impl FinishReason {
    /// Map a Gemini `finishReason` value.
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => Self::Safety,
            _ => Self::Error,
        }
    }
}

/// One incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamChunk {
    pub delta_text: String,
    pub is_final: bool,
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    /// A non-final text delta.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta_text: text.into(),
            is_final: false,
            finish_reason: None,
        }
    }

    /// The closing chunk of a stream.
    pub fn last(text: impl Into<String>, finish_reason: Option<FinishReason>) -> Self {
        Self {
            delta_text: text.into(),
            is_final: true,
            finish_reason,
        }
    }
}

/// Boxed stream of chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, VideoError>> + Send>>;

/// Drain a stream into its full text and final finish reason.
pub async fn collect_text(mut stream: ChunkStream) -> Result<(String, Option<FinishReason>), VideoError> {
    use futures::StreamExt;

    let mut text = String::new();
    let mut finish = None;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        text.push_str(&chunk.delta_text);
        if chunk.is_final {
            finish = chunk.finish_reason;
            break;
        }
    }
    Ok((text, finish))
}
