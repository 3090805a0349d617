//! Orchestrator
//!
//! Entry points the host calls:
//! - [`VideoPipe::chat_turn`]: detect links, fetch metadata, assemble the
//!   payload, stream the answer into an [`OutputSink`]
//! - [`VideoPipe::summarize_video`]: one aggregated summary for a video
//!
//! A message without YouTube links becomes a plain text generation.

mod sink;
mod summary;

pub use sink::{ChannelSink, CollectingSink, OutputSink, SinkEvent, StatusEvent};
pub use summary::{SummaryMethod, VideoSummary, extract_key_points};

use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{GenerationConfig, Settings, Timeouts};
use crate::error::{Result, VideoError, format_summary, summarize_error};
use crate::models::resolve_model_name;
use crate::providers::gemini::convert::{convert_history, convert_parts};
use crate::providers::gemini::payload::strip_video_urls;
use crate::providers::gemini::{
    ChatTurn, ContentPart, GeminiClient, MessageContent, PayloadAssembler, RequestPayload, Role,
    VideoAttachment,
};
use crate::stream::ChunkStream;
use crate::utils::CancelHandle;
use crate::youtube::{
    FetcherConfig, MetadataSource, VideoMetadata, VideoReference, YouTubeMetadataFetcher,
    detect_video_matches,
};

/// One chat turn as the host hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Host model id; the pipe's default model when `None`
    pub model: Option<String>,
    /// The current user message
    pub message: MessageContent,
    /// Prior turns, oldest first
    pub history: Vec<ChatTurn>,
}

impl ChatRequest {
    pub fn new(message: impl Into<MessageContent>) -> Self {
        Self {
            model: None,
            message: message.into(),
            history: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    /// Split a host message list: the last turn is the current message and
    /// must come from the user.
    pub fn from_messages(mut messages: Vec<ChatTurn>) -> Result<Self> {
        let current = messages
            .pop()
            .ok_or_else(|| VideoError::InvalidInput("no messages".to_string()))?;
        if current.role != Role::User {
            return Err(VideoError::InvalidInput(
                "the last message must come from the user".to_string(),
            ));
        }
        Ok(Self {
            model: None,
            message: current.content,
            history: messages,
        })
    }
}

/// The video-aware Gemini pipe.
pub struct VideoPipe {
    client: Option<GeminiClient>,
    fetcher: Arc<dyn MetadataSource>,
    config: GenerationConfig,
    timeouts: Timeouts,
}

impl std::fmt::Debug for VideoPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPipe")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl VideoPipe {
    /// Build a pipe from host settings.
    ///
    /// A missing API key is not an error here; every call reports
    /// [`VideoError::MissingApiKey`] instead.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = if settings.has_api_key() {
            Some(GeminiClient::from_settings(settings)?)
        } else {
            tracing::warn!("GEMINI_API_KEY is not set");
            None
        };
        let fetcher = YouTubeMetadataFetcher::new(FetcherConfig::default())?;
        Ok(Self {
            client,
            fetcher: Arc::new(fetcher),
            config: settings.generation_config()?,
            timeouts: Timeouts::default(),
        })
    }

    pub fn with_parts(
        client: Option<GeminiClient>,
        fetcher: Arc<dyn MetadataSource>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            fetcher,
            config,
            timeouts: Timeouts::default(),
        }
    }

    /// Bounds for the provider connection, the whole generation and each
    /// metadata fetch.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.client = self.client.map(|c| c.with_timeouts(timeouts));
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Generation config derived from the settings.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn client_for(&self, model: Option<&str>) -> Result<GeminiClient> {
        let client = self.client.as_ref().ok_or_else(|| {
            VideoError::MissingApiKey("GEMINI_API_KEY is not set".to_string())
        })?;
        Ok(match model {
            Some(model) if resolve_model_name(model) != client.model() => client.with_model(model),
            _ => client.clone(),
        })
    }

    /// One metadata fetch, bounded by `timeouts.metadata_fetch`.
    async fn fetch_one(&self, reference: &VideoReference) -> Result<VideoMetadata> {
        let limit = self.timeouts.metadata_fetch;
        tokio::time::timeout(limit, self.fetcher.fetch_metadata(reference))
            .await
            .unwrap_or_else(|_| {
                Err(VideoError::TimeoutError(format!(
                    "metadata fetch exceeded {}ms",
                    limit.as_millis()
                )))
            })
    }

    /// Fetch metadata for every reference concurrently, keeping their order.
    ///
    /// Each fetch is bounded by `timeouts.metadata_fetch`; failures and
    /// timeouts degrade to `metadata = None`.
    pub async fn fetch_attachments(&self, references: Vec<VideoReference>) -> Vec<VideoAttachment> {
        let fetches = references.iter().map(|r| self.fetch_one(r));
        let results = join_all(fetches).await;

        references
            .into_iter()
            .zip(results)
            .map(|(reference, result)| match result {
                Ok(metadata) => {
                    tracing::info!(
                        video_id = reference.video_id(),
                        title = %metadata.title,
                        transcript = metadata.has_transcript(),
                        "fetched video metadata"
                    );
                    VideoAttachment::new(reference, Some(metadata))
                }
                Err(e) => {
                    tracing::info!(
                        video_id = reference.video_id(),
                        reason = %e,
                        "metadata unavailable, continuing with the video only"
                    );
                    VideoAttachment::new(reference, None)
                }
            })
            .collect()
    }

    /// Detect, fetch and assemble the payload for one turn.
    ///
    /// Cancelling while metadata is being fetched returns
    /// [`VideoError::Cancelled`] without waiting for the fetches.
    pub async fn prepare(
        &self,
        request: &ChatRequest,
        config: &GenerationConfig,
        cancel: &CancelHandle,
    ) -> Result<RequestPayload> {
        let text = request.message.text();
        let media = request.message.media();

        let mut references: Vec<VideoReference> = Vec::new();
        if config.auto_detect_youtube() {
            for detected in detect_video_matches(&text, config.max_videos()) {
                tracing::info!(
                    video_id = detected.reference.video_id(),
                    url = %detected.matched_text,
                    start = ?detected.reference.start_time_seconds(),
                    "detected YouTube link"
                );
                references.push(detected.reference);
            }
        }
        let mut other_media: Vec<ContentPart> = Vec::with_capacity(media.len());
        for item in media {
            match item.youtube_reference() {
                Some(reference) => {
                    if !references.iter().any(|r| r.video_id() == reference.video_id()) {
                        references.push(reference);
                    }
                }
                None => other_media.push(item),
            }
        }

        let prompt = if references.is_empty() {
            tracing::info!("no YouTube links detected, sending a text-only request");
            text
        } else if config.enable_vision() {
            strip_video_urls(&text, &references.iter().collect::<Vec<_>>())
        } else {
            text
        };

        let attachments = if references.is_empty() {
            Vec::new()
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("turn cancelled while fetching metadata");
                    return Err(VideoError::Cancelled);
                }
                attachments = self.fetch_attachments(references) => attachments,
            }
        };

        PayloadAssembler::new()
            .with_history(convert_history(&request.history, config)?)
            .with_extra_parts(convert_parts(&other_media, config)?)
            .assemble(&prompt, attachments, config)
    }

    /// Prepare and open the answer stream.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        config: &GenerationConfig,
        cancel: CancelHandle,
    ) -> Result<ChunkStream> {
        let client = self.client_for(request.model.as_deref())?;
        let payload = self.prepare(request, config, &cancel).await?;
        client.stream(&payload, cancel).await
    }

    /// Chat-turn hook.
    ///
    /// Forwards chunks to `sink` in order and returns the full text. A
    /// cancelled turn ends cleanly with the text produced so far. Errors are
    /// reported to the sink as a final status before being returned.
    pub async fn chat_turn(
        &self,
        request: &ChatRequest,
        config: &GenerationConfig,
        sink: &mut dyn OutputSink,
        cancel: CancelHandle,
    ) -> Result<String> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("chat_turn", request_id = %request_id);
        async {
            let result = self.run_turn(request, config, sink, cancel).await;
            match result {
                Ok(text) => Ok(text),
                Err(VideoError::Cancelled) => {
                    sink.status(StatusEvent::done("Generation stopped")).await;
                    Ok(String::new())
                }
                Err(e) => {
                    let summary = summarize_error(&e);
                    tracing::error!(
                        kind = ?summary.kind,
                        status = ?summary.status,
                        diagnosis = %summary.diagnosis,
                        "chat turn failed"
                    );
                    sink.status(StatusEvent::done(format_summary(&summary, false)))
                        .await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_turn(
        &self,
        request: &ChatRequest,
        config: &GenerationConfig,
        sink: &mut dyn OutputSink,
        cancel: CancelHandle,
    ) -> Result<String> {
        let client = self.client_for(request.model.as_deref())?;
        sink.status(StatusEvent::progress("Processing request...")).await;

        let payload = self.prepare(request, config, &cancel).await?;
        tracing::info!(
            model = client.model(),
            videos = payload.attachments.len(),
            vision = config.enable_vision(),
            "sending request"
        );
        sink.status(StatusEvent::progress(format!(
            "Sending request to Gemini {}...",
            client.model()
        )))
        .await;

        let mut stream = client.stream(&payload, cancel.clone()).await?;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            text.push_str(&chunk.delta_text);
            sink.chunk(&chunk).await;
            if chunk.is_final {
                break;
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(chars = text.len(), "turn cancelled");
            sink.status(StatusEvent::done("Generation stopped")).await;
        } else {
            sink.status(StatusEvent::done("Streaming completed")).await;
        }
        Ok(text)
    }
}
