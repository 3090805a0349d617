//! Request payload assembly
//!
//! A [`RequestPayload`] combines the prompt, the attached videos with
//! whatever metadata was retrieved for them, prior turns and the immutable
//! [`GenerationConfig`]. It is built fresh per call and turned into the wire
//! request by [`RequestPayload::to_request`].

use super::convert::video_part;
use super::types::{Content, GenerateContentRequest, GenerationParams, Part};
use crate::config::GenerationConfig;
use crate::error::{INLINE_PAYLOAD_LIMIT_BYTES, Result, VideoError};
use crate::youtube::{VideoMetadata, VideoReference, find_video_links};
use std::collections::HashSet;

/// Prompt used when the message held nothing but video links.
pub const DEFAULT_VIDEO_PROMPT: &str =
    "Please analyze this video and describe its content in detail.";
pub const DEFAULT_TOP_P: f32 = 0.95;
/// Transcript characters embedded per video.
pub const TRANSCRIPT_CONTEXT_CHARS: usize = 12_000;

/// A video attached to a request and what is known about it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAttachment {
    pub reference: VideoReference,
    /// `None` when metadata retrieval failed
    pub metadata: Option<VideoMetadata>,
}

impl VideoAttachment {
    pub fn new(reference: VideoReference, metadata: Option<VideoMetadata>) -> Self {
        Self {
            reference,
            metadata,
        }
    }

    /// Text block describing the video for the model.
    ///
    /// Returns `None` when there is nothing beyond the link to say.
    fn context_block(&self, index: usize) -> Option<String> {
        let meta = self.metadata.as_ref().filter(|m| !m.fallback)?;
        let mut block = format!(
            "Video {}: \"{}\" by {} ({})\n{}",
            index + 1,
            meta.title,
            meta.channel,
            meta.duration_label(),
            self.reference.watch_url()
        );
        if let Some(start) = self.reference.start_time_seconds() {
            block.push_str(&format!("\nStart at: {start}s"));
        }
        if let Some(transcript) = meta.transcript_text(TRANSCRIPT_CONTEXT_CHARS) {
            block.push_str("\nTranscript:\n");
            block.push_str(&transcript);
        }
        Some(block)
    }
}

/// Fully assembled request, ready for the client.
#[derive(Debug, Clone)]
pub struct RequestPayload {
    pub prompt: String,
    pub attachments: Vec<VideoAttachment>,
    pub config: GenerationConfig,
    /// Prior turns, already converted
    pub history: Vec<Content>,
    /// Additional parts of the current message (images, inline video)
    pub extra_parts: Vec<Part>,
}

impl RequestPayload {
    pub fn references(&self) -> Vec<&VideoReference> {
        self.attachments.iter().map(|a| &a.reference).collect()
    }

    /// Transcript and metadata context for all attachments.
    pub fn context_text(&self) -> Option<String> {
        let blocks: Vec<String> = self
            .attachments
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.context_block(i))
            .collect();
        if blocks.is_empty() {
            None
        } else {
            Some(format!(
                "Video context (metadata and transcript):\n\n{}",
                blocks.join("\n\n")
            ))
        }
    }

    /// Build the wire request.
    ///
    /// The current user turn is laid out as: native video parts (vision only),
    /// extra parts, the context block, then the prompt.
    pub fn to_request(&self) -> Result<GenerateContentRequest> {
        let mut parts = Vec::with_capacity(self.attachments.len() + self.extra_parts.len() + 2);
        if self.config.enable_vision() {
            parts.extend(
                self.attachments
                    .iter()
                    .map(|a| video_part(&a.reference, self.config.video_fps())),
            );
        }
        parts.extend(self.extra_parts.iter().cloned());
        if let Some(context) = self.context_text() {
            parts.push(Part::text(context));
        }
        parts.push(Part::text(self.prompt.clone()));

        let mut contents = self.history.clone();
        contents.push(Content::user(parts));

        let size: usize = contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(Part::approximate_size)
            .sum();
        if size > INLINE_PAYLOAD_LIMIT_BYTES {
            return Err(VideoError::PayloadTooLargeError {
                size,
                limit: INLINE_PAYLOAD_LIMIT_BYTES,
            });
        }

        Ok(GenerateContentRequest {
            contents,
            generation_config: Some(GenerationParams {
                temperature: self.config.temperature(),
                max_output_tokens: self.config.max_output_tokens(),
                top_p: Some(DEFAULT_TOP_P),
            }),
        })
    }
}

/// Builds [`RequestPayload`]s.
#[derive(Debug, Clone, Default)]
pub struct PayloadAssembler {
    history: Vec<Content>,
    extra_parts: Vec<Part>,
}

impl PayloadAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn with_extra_parts(mut self, parts: Vec<Part>) -> Self {
        self.extra_parts = parts;
        self
    }

    /// Assemble a payload.
    ///
    /// Attachments beyond `config.max_videos()` are dropped in order, with a
    /// warning naming the dropped ids. An empty prompt is replaced by
    /// [`DEFAULT_VIDEO_PROMPT`] when videos are attached.
    pub fn assemble(
        self,
        prompt: &str,
        mut attachments: Vec<VideoAttachment>,
        config: &GenerationConfig,
    ) -> Result<RequestPayload> {
        let max = config.max_videos();
        if attachments.len() > max {
            let dropped: Vec<String> = attachments
                .drain(max..)
                .map(|a| a.reference.video_id().to_string())
                .collect();
            tracing::warn!(
                max_videos = max,
                dropped = ?dropped,
                "too many videos for one request, dropping the excess"
            );
        }

        let mut prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            if attachments.is_empty() && self.extra_parts.is_empty() {
                return Err(VideoError::InvalidInput("empty message".to_string()));
            }
            prompt = DEFAULT_VIDEO_PROMPT.to_string();
        }

        Ok(RequestPayload {
            prompt,
            attachments,
            config: config.clone(),
            history: self.history,
            extra_parts: self.extra_parts,
        })
    }
}

/// Remove every link to one of `references` from `text`.
///
/// Used when the videos travel as native parts so the model does not see
/// them twice. Links are cut by their matched span, so a bare link never
/// eats into a longer link to the same video.
pub fn strip_video_urls(text: &str, references: &[&VideoReference]) -> String {
    let ids: HashSet<&str> = references.iter().map(|r| r.video_id()).collect();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for link in find_video_links(text) {
        if ids.contains(link.reference.video_id()) {
            out.push_str(&text[cursor..link.span.start]);
            cursor = link.span.end;
        }
    }
    out.push_str(&text[cursor..]);

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
