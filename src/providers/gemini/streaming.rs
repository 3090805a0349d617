//! Gemini streaming implementation using eventsource-stream
//!
//! `streamGenerateContent?alt=sse` sends one `GenerateContentResponse` per
//! SSE event. Each event becomes at most one [`StreamChunk`]; the event that
//! carries a `finishReason` becomes the final chunk.

use super::types::GenerateContentResponse;
use crate::error::{Result, VideoError, classify_http_error};
use crate::stream::{ChunkStream, FinishReason, StreamChunk};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::StreamExt;

/// Gemini event converter
#[derive(Debug, Clone, Default)]
pub struct GeminiEventConverter;

impl GeminiEventConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert one SSE event.
    ///
    /// `Ok(None)` for events with neither text nor a finish reason
    /// (keep-alives, usage-only events).
    pub fn convert_event(&self, event: &Event) -> Result<Option<StreamChunk>> {
        let data = event.data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(None);
        }

        let response: GenerateContentResponse = serde_json::from_str(data)
            .map_err(|e| VideoError::ParseError(format!("Failed to parse Gemini SSE JSON: {e}")))?;
        self.convert_response(response, data)
    }

    fn convert_response(
        &self,
        response: GenerateContentResponse,
        raw: &str,
    ) -> Result<Option<StreamChunk>> {
        if let Some(error) = &response.error {
            let code = if error.code == 0 { 500 } else { error.code };
            return Err(classify_http_error(code, raw));
        }
        if let Some(reason) = response.block_reason() {
            return Err(VideoError::ProviderError {
                code: 400,
                message: format!("Prompt blocked by safety filters: {reason}"),
                details: None,
            });
        }

        let text = response.text();
        match response.finish_reason() {
            Some(reason) => Ok(Some(StreamChunk::last(
                text,
                Some(FinishReason::from_gemini(reason)),
            ))),
            None if text.is_empty() => Ok(None),
            None => Ok(Some(StreamChunk::delta(text))),
        }
    }
}

/// Turn an open SSE response into a [`ChunkStream`].
///
/// The stream ends after the final chunk, after the first error, or when
/// `deadline` passes (yielding [`VideoError::TimeoutError`]). If the
/// connection closes without a finish reason a synthetic empty final chunk
/// is emitted so consumers always see exactly one final chunk.
pub fn chunk_stream(
    response: reqwest::Response,
    converter: GeminiEventConverter,
    deadline: tokio::time::Instant,
) -> ChunkStream {
    let s = async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();
        let mut delivered = 0usize;
        loop {
            let next = match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(chunks = delivered, "generation exceeded the maximum duration");
                    yield Err(VideoError::TimeoutError(
                        "generation exceeded the maximum duration".to_string(),
                    ));
                    return;
                }
            };
            match next {
                None => break,
                Some(Err(e)) => {
                    tracing::warn!(chunks = delivered, error = %e, "SSE stream broke");
                    yield Err(stream_failure(e));
                    return;
                }
                Some(Ok(event)) => match converter.convert_event(&event) {
                    Ok(Some(chunk)) => {
                        let is_final = chunk.is_final;
                        delivered += 1;
                        yield Ok(chunk);
                        if is_final {
                            tracing::debug!(chunks = delivered, "stream finished");
                            return;
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                },
            }
        }
        tracing::debug!(chunks = delivered, "stream closed without finish reason");
        yield Ok(StreamChunk::last(String::new(), None));
    };
    Box::pin(s)
}

/// A connection that dies mid-body is a transport failure; bytes that do
/// not form SSE events are a stream failure.
fn stream_failure(error: EventStreamError<reqwest::Error>) -> VideoError {
    match error {
        EventStreamError::Transport(e) => {
            VideoError::NetworkError(format!("connection lost mid-stream: {e}"))
        }
        other => VideoError::StreamError(format!("SSE parsing error: {other}")),
    }
}
