//! Standalone video summary.
//!
//! Native video understanding first. When the provider cannot handle the
//! video, the summary is rebuilt from metadata and transcript, plus a
//! thumbnail assessment when a real thumbnail is available.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::Instrument;

use super::VideoPipe;
use crate::config::GenerationConfig;
use crate::error::{Result, VideoError};
use crate::providers::gemini::GeminiClient;
use crate::providers::gemini::convert::video_part;
use crate::providers::gemini::types::{Content, GenerateContentRequest, GenerationParams, Part};
use crate::stream::{FinishReason, collect_text};
use crate::utils::CancelHandle;
use crate::youtube::{VideoMetadata, VideoReference, detect_videos_capped, parse_video_url};

const NATIVE_MAX_TOKENS: u32 = 2000;
const FALLBACK_MAX_TOKENS: u32 = 1500;
const THUMBNAIL_MAX_TOKENS: u32 = 300;
const FALLBACK_TRANSCRIPT_CHARS: usize = 3000;

const ANALYSIS_PROMPT: &str = "Please analyze this YouTube video and provide a comprehensive summary. Include:
1. A concise summary (2-3 sentences) of the main topic and content
2. Key points covered in the video (bullet points)
3. Target audience and content style assessment
4. Main takeaways or conclusions
5. Overall assessment of content quality and production value
6. Any notable visual elements, graphics, or presentation style

Focus on both the spoken content and visual elements of the video.";

const THUMBNAIL_PROMPT: &str = "Please analyze this YouTube video thumbnail and comment on its visual appeal, design quality, and how well it represents the content.";

const NO_TRANSCRIPT: &str = "Transcript not available for this video. Analysis will be based on thumbnail and metadata only.";

/// How the summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMethod {
    NativeVideo,
    TranscriptFallback,
}

/// Result of the standalone-summary hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: u64,
    pub view_count: Option<u64>,
    pub method: SummaryMethod,
    /// Generated summary text
    pub text: String,
    /// Bullet lines of `text`
    pub key_points: Vec<String>,
    pub thumbnail_assessment: Option<String>,
    /// Markdown report for display
    pub report: String,
}

/// What one summary call needs besides the video itself.
struct SummaryCall<'a> {
    client: &'a GeminiClient,
    config: &'a GenerationConfig,
    cancel: &'a CancelHandle,
}

impl SummaryCall<'_> {
    fn request(&self, parts: Vec<Part>, max_output_tokens: u32) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationParams {
                temperature: self.config.temperature(),
                max_output_tokens,
                top_p: None,
            }),
        }
    }

    /// Stream one request to completion. A cancelled call is an error here,
    /// never a truncated answer.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<(String, Option<FinishReason>)> {
        let stream = self
            .client
            .stream_request(request, self.cancel.clone())
            .await?;
        let generated = collect_text(stream).await?;
        if self.cancel.is_cancelled() {
            return Err(VideoError::Cancelled);
        }
        Ok(generated)
    }
}

impl VideoPipe {
    /// Standalone-summary hook.
    ///
    /// Accepts any text containing a YouTube link and summarizes the first
    /// video found. With vision disabled no video or image is sent and the
    /// summary comes from metadata and transcript. Cancelling `cancel` stops
    /// whichever step is running and returns [`VideoError::Cancelled`].
    pub async fn summarize_video(
        &self,
        url: &str,
        config: &GenerationConfig,
        cancel: CancelHandle,
    ) -> Result<VideoSummary> {
        let reference = parse_video_url(url.trim())
            .or_else(|| detect_videos_capped(url, 1).into_iter().next())
            .ok_or_else(|| VideoError::InvalidInput("Invalid YouTube URL format".to_string()))?;
        let client = self.client_for(None)?;
        let call = SummaryCall {
            client: &client,
            config,
            cancel: &cancel,
        };

        let span = tracing::info_span!(
            "summarize_video",
            request_id = %uuid::Uuid::new_v4(),
            video_id = reference.video_id()
        );
        self.summarize_reference(&call, &reference)
            .instrument(span)
            .await
    }

    async fn summarize_reference(
        &self,
        call: &SummaryCall<'_>,
        reference: &VideoReference,
    ) -> Result<VideoSummary> {
        let fetched = tokio::select! {
            biased;
            _ = call.cancel.cancelled() => return Err(VideoError::Cancelled),
            fetched = self.fetch_one(reference) => fetched,
        };
        let metadata = match fetched {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(video_id = reference.video_id(), reason = %e, "using fallback metadata");
                VideoMetadata::fallback(reference)
            }
        };

        if !call.config.enable_vision() {
            tracing::info!(
                video_id = reference.video_id(),
                "vision disabled, summarizing from transcript and metadata"
            );
            return self.fallback_analysis(call, &metadata).await;
        }

        match native_analysis(call, reference).await {
            Ok(text) => {
                tracing::info!(video_id = reference.video_id(), "native video analysis succeeded");
                Ok(build_summary(&metadata, SummaryMethod::NativeVideo, text, None))
            }
            Err(e) if matches!(e, VideoError::Cancelled | VideoError::MissingApiKey(_)) => Err(e),
            Err(e) => {
                tracing::warn!(
                    video_id = reference.video_id(),
                    error = %e,
                    "video understanding failed, falling back to transcript and thumbnail"
                );
                self.fallback_analysis(call, &metadata).await
            }
        }
    }

    async fn fallback_analysis(
        &self,
        call: &SummaryCall<'_>,
        metadata: &VideoMetadata,
    ) -> Result<VideoSummary> {
        let transcript = metadata
            .timestamped_transcript(FALLBACK_TRANSCRIPT_CHARS)
            .unwrap_or_else(|| NO_TRANSCRIPT.to_string());
        let prompt = fallback_prompt(metadata, &transcript);
        let (text, _) = call
            .generate(&call.request(vec![Part::text(prompt)], FALLBACK_MAX_TOKENS))
            .await?;

        let thumbnail_assessment = if metadata.fallback || !call.config.enable_vision() {
            None
        } else {
            self.assess_thumbnail(call, metadata).await?
        };

        Ok(build_summary(
            metadata,
            SummaryMethod::TranscriptFallback,
            text,
            thumbnail_assessment,
        ))
    }

    /// `Ok(None)` whenever the assessment cannot be produced, except on
    /// cancellation.
    async fn assess_thumbnail(
        &self,
        call: &SummaryCall<'_>,
        metadata: &VideoMetadata,
    ) -> Result<Option<String>> {
        let thumbnail = match self.fetcher.fetch_thumbnail(&metadata.thumbnail_url).await {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                tracing::info!(video_id = %metadata.video_id, reason = %e, "thumbnail unavailable");
                return Ok(None);
            }
        };
        let request = call.request(
            vec![
                Part::text(THUMBNAIL_PROMPT),
                Part::inline(thumbnail.mime_type, STANDARD.encode(&thumbnail.bytes)),
            ],
            THUMBNAIL_MAX_TOKENS,
        );
        match call.generate(&request).await {
            Ok((text, _)) if !text.trim().is_empty() => Ok(Some(text)),
            Ok(_) => Ok(None),
            Err(VideoError::Cancelled) => Err(VideoError::Cancelled),
            Err(e) => {
                tracing::warn!(video_id = %metadata.video_id, error = %e, "thumbnail assessment failed");
                Ok(None)
            }
        }
    }
}

async fn native_analysis(call: &SummaryCall<'_>, reference: &VideoReference) -> Result<String> {
    let request = call.request(
        vec![
            video_part(reference, call.config.video_fps()),
            Part::text(ANALYSIS_PROMPT),
        ],
        NATIVE_MAX_TOKENS,
    );
    let (text, finish_reason) = call.generate(&request).await?;
    if text.trim().is_empty() {
        return Err(VideoError::provider(
            500,
            format!("empty video analysis (finish reason {finish_reason:?})"),
        ));
    }
    Ok(text)
}

fn fallback_prompt(metadata: &VideoMetadata, transcript: &str) -> String {
    let published = metadata
        .publish_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "Please analyze this YouTube video and provide a comprehensive summary. Here's the information:

**Video Metadata:**
- Title: {title}
- Author: {channel}
- Duration: {duration} seconds
- Views: {views}
- Published: {published}

**Video Content:**
{transcript}

Please provide:
1. A concise summary (2-3 sentences) of the main topic
2. Key points covered in the video (bullet points)
3. Target audience and content style
4. Main takeaways or conclusions
5. Overall assessment of content quality

Focus on the actual content rather than just metadata.",
        title = metadata.title,
        channel = metadata.channel,
        duration = metadata.duration_seconds,
        views = format_views(metadata.view_count),
    )
}

/// Bullet lines (`-`, `*`, `•`) of a generated text, markers and bold removed.
pub fn extract_key_points(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
        })
        .map(|point| point.replace("**", "").trim().to_string())
        .filter(|point| !point.is_empty())
        .collect()
}

fn format_views(views: Option<u64>) -> String {
    let Some(views) = views else {
        return "Unknown".to_string();
    };
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn build_summary(
    metadata: &VideoMetadata,
    method: SummaryMethod,
    text: String,
    thumbnail_assessment: Option<String>,
) -> VideoSummary {
    let (heading, footer) = match method {
        SummaryMethod::NativeVideo => (
            "Video Analysis",
            "Analysis completed using Gemini video understanding",
        ),
        SummaryMethod::TranscriptFallback => (
            "Fallback Method",
            "Analysis completed using Gemini (Fallback: Transcript + Thumbnail)",
        ),
    };
    let thumbnail = thumbnail_assessment
        .as_deref()
        .map(|t| format!("\n\n**Thumbnail Analysis:**\n{t}"))
        .unwrap_or_default();
    let report = format!(
        "# YouTube Video Summary ({heading})\n\n\
         **Video:** {title}\n\
         **Channel:** {channel}\n\
         **Duration:** {duration}\n\
         **Views:** {views}\n\n\
         ---\n\n\
         {text}{thumbnail}\n\n\
         ---\n\n\
         *{footer}*",
        title = metadata.title,
        channel = metadata.channel,
        duration = metadata.duration_label(),
        views = format_views(metadata.view_count),
    );

    VideoSummary {
        video_id: metadata.video_id.clone(),
        title: metadata.title.clone(),
        channel: metadata.channel.clone(),
        duration_seconds: metadata.duration_seconds,
        view_count: metadata.view_count,
        method,
        key_points: extract_key_points(&text),
        text,
        thumbnail_assessment,
        report,
    }
}
