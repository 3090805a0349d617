//! Host chat format to Gemini conversion (pure functions)
//!
//! The host sends OpenAI-style messages: `{role, content}` where `content`
//! is either a string or a list of `{"type": "text" | "image_url" |
//! "video_url", ...}` items.

use serde::{Deserialize, Serialize};

use super::types::{Content, FileData, Part, VideoMetadata};
use crate::config::GenerationConfig;
use crate::error::{INLINE_PAYLOAD_LIMIT_BYTES, Result, VideoError};
use crate::youtube::{VideoReference, parse_video_url};

pub const IMAGE_VISION_DISABLED: &str = "[Image content not processed - vision disabled]";
pub const VIDEO_VISION_DISABLED: &str = "[Video content not processed - vision disabled]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Gemini only knows `user` and `model`; system turns travel as user turns.
    pub fn gemini_role(self) -> &'static str {
        match self {
            Role::Assistant => "model",
            Role::System | Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
}

/// One item of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    VideoUrl { video_url: MediaUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: MediaUrl { url: url.into() },
        }
    }

    pub fn video_url(url: impl Into<String>) -> Self {
        Self::VideoUrl {
            video_url: MediaUrl { url: url.into() },
        }
    }

    /// The YouTube reference of a `video_url` item, if it points at one.
    pub fn youtube_reference(&self) -> Option<VideoReference> {
        match self {
            Self::VideoUrl { video_url } => parse_video_url(&video_url.url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text items joined by newlines.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Non-text items in order.
    pub fn media(&self) -> Vec<ContentPart> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| !matches!(p, ContentPart::Text { .. }))
                .cloned()
                .collect(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A prior (or current) conversation turn as the host supplies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatTurn {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Native video part for a YouTube reference.
///
/// `fps` is always sent as configured; `startOffset` only when the link
/// carried a start time.
pub fn video_part(reference: &VideoReference, fps: f64) -> Part {
    Part::FileData {
        file_data: FileData {
            file_uri: reference.watch_url(),
            mime_type: None,
        },
        video_metadata: Some(VideoMetadata {
            fps,
            start_offset: reference.start_time_seconds().map(|s| format!("{s}s")),
        }),
    }
}

/// Split a `data:<mime>;base64,<data>` URL.
pub fn parse_data_url(data_url: &str) -> Option<(String, String)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let mime_type = header.split(';').next().unwrap_or_default();
    if mime_type.is_empty() {
        return None;
    }
    Some((mime_type.to_string(), data.to_string()))
}

/// Decoded size of a base64 body without decoding it.
fn decoded_len(base64_data: &str) -> usize {
    let trimmed = base64_data.trim_end_matches('=');
    trimmed.len() * 3 / 4
}

/// Convert content items to Gemini parts.
///
/// Text stays text. With vision enabled, data-URL images and videos become
/// inline parts and YouTube links native video parts; anything else becomes a
/// bracketed text placeholder. With vision disabled all media is replaced by a
/// placeholder.
pub fn convert_parts(items: &[ContentPart], config: &GenerationConfig) -> Result<Vec<Part>> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ContentPart::Text { text } => {
                if !text.is_empty() {
                    parts.push(Part::text(text.clone()));
                }
            }
            ContentPart::ImageUrl { .. } if !config.enable_vision() => {
                parts.push(Part::text(IMAGE_VISION_DISABLED));
            }
            ContentPart::VideoUrl { .. } if !config.enable_vision() => {
                parts.push(Part::text(VIDEO_VISION_DISABLED));
            }
            ContentPart::ImageUrl { image_url } => {
                let url = &image_url.url;
                if url.starts_with("data:image") {
                    match parse_data_url(url) {
                        Some((mime_type, data)) => parts.push(Part::inline(mime_type, data)),
                        None => {
                            tracing::warn!("malformed image data URL");
                            parts.push(Part::text("[Error processing image]"));
                        }
                    }
                } else {
                    parts.push(Part::text(format!("[Image URL: {url}]")));
                }
            }
            ContentPart::VideoUrl { video_url } => {
                let url = &video_url.url;
                if let Some(reference) = parse_video_url(url) {
                    tracing::info!(video_id = reference.video_id(), "added YouTube video part");
                    parts.push(video_part(&reference, config.video_fps()));
                } else if url.starts_with("data:video") {
                    match parse_data_url(url) {
                        Some((mime_type, data)) => {
                            let size = decoded_len(&data);
                            if size > INLINE_PAYLOAD_LIMIT_BYTES {
                                return Err(VideoError::PayloadTooLargeError {
                                    size,
                                    limit: INLINE_PAYLOAD_LIMIT_BYTES,
                                });
                            }
                            parts.push(Part::inline(mime_type, data));
                        }
                        None => {
                            tracing::warn!("malformed video data URL");
                            parts.push(Part::text("[Error processing video]"));
                        }
                    }
                } else {
                    parts.push(Part::text(format!("[Video URL: {url}]")));
                }
            }
        }
    }
    Ok(parts)
}

/// Convert prior turns to Gemini contents.
///
/// System turns are merged and sent first as a user turn prefixed with
/// `System: `. Turns that convert to no parts are dropped.
pub fn convert_history(turns: &[ChatTurn], config: &GenerationConfig) -> Result<Vec<Content>> {
    let system: Vec<String> = turns
        .iter()
        .filter(|t| t.role == Role::System)
        .map(|t| t.content.text())
        .filter(|t| !t.trim().is_empty())
        .collect();

    let mut contents = Vec::with_capacity(turns.len() + 1);
    if !system.is_empty() {
        contents.push(Content::user(vec![Part::text(format!(
            "System: {}",
            system.join("\n")
        ))]));
    }

    for turn in turns.iter().filter(|t| t.role != Role::System) {
        let parts = match &turn.content {
            MessageContent::Text(text) if text.is_empty() => Vec::new(),
            MessageContent::Text(text) => vec![Part::text(text.clone())],
            MessageContent::Parts(items) => convert_parts(items, config)?,
        };
        if parts.is_empty() {
            continue;
        }
        contents.push(Content {
            role: Some(turn.role.gemini_role().to_string()),
            parts,
        });
    }
    Ok(contents)
}
