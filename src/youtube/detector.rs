//! YouTube URL detection.
//!
//! Scans free text for links to YouTube videos and normalizes every
//! supported shape (`watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`, `/v/`,
//! `/live/`) to a [`VideoReference`]. Malformed candidates are skipped.

use crate::config::MAX_VIDEOS_PER_REQUEST;
use crate::error::{Result, VideoError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;

lazy_static! {
    static ref VIDEO_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex");
    static ref URL_CANDIDATE: Regex = Regex::new(
        r#"(?i)(?:https?://)?(?:[a-z0-9-]+\.)*(?:youtube\.com|youtube-nocookie\.com|youtu\.be)/[^\s<>"'`\]\)]+"#
    )
    .expect("valid regex");
    static ref TIMESTAMP: Regex =
        Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?$").expect("valid regex");
}

/// A validated reference to a single video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VideoReference {
    video_id: String,
    start_time_seconds: Option<u64>,
}

impl VideoReference {
    /// Construct a reference; fails if `video_id` is not an 11-character
    /// platform identifier.
    pub fn new(video_id: impl Into<String>, start_time_seconds: Option<u64>) -> Result<Self> {
        let video_id = video_id.into();
        if !is_valid_video_id(&video_id) {
            return Err(VideoError::InvalidInput(format!(
                "not a YouTube video id: {video_id:?}"
            )));
        }
        Ok(Self {
            video_id,
            start_time_seconds,
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn start_time_seconds(&self) -> Option<u64> {
        self.start_time_seconds
    }

    /// Canonical watch URL, the form the provider accepts as a file URI.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    /// Highest resolution static thumbnail.
    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", self.video_id)
    }
}

pub fn is_valid_video_id(candidate: &str) -> bool {
    VIDEO_ID.is_match(candidate)
}

/// Extract up to [`MAX_VIDEOS_PER_REQUEST`] references from `text`.
pub fn detect_videos(text: &str) -> Vec<VideoReference> {
    detect_videos_capped(text, MAX_VIDEOS_PER_REQUEST)
}

/// Extract references in order of first appearance, deduplicated by video id
/// and capped at `max`.
pub fn detect_videos_capped(text: &str, max: usize) -> Vec<VideoReference> {
    detect_video_matches(text, max)
        .into_iter()
        .map(|m| m.reference)
        .collect()
}

/// A detected reference plus the exact URL text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedVideo {
    pub reference: VideoReference,
    /// The matched URL as it appeared in the text
    pub matched_text: String,
}

/// Like [`detect_videos_capped`] but keeps the URL text of each first match.
pub fn detect_video_matches(text: &str, max: usize) -> Vec<DetectedVideo> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    if max == 0 {
        return out;
    }

    for link in find_video_links(text) {
        if !seen.insert(link.reference.video_id.clone()) {
            continue;
        }
        out.push(DetectedVideo {
            matched_text: text[link.span].to_string(),
            reference: link.reference,
        });
        if out.len() == max {
            break;
        }
    }
    out
}

/// One occurrence of a video link: the byte range it covers in the
/// scanned text and the reference it parses to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    pub span: Range<usize>,
    pub reference: VideoReference,
}

/// Every parseable YouTube link in `text`, repeats included, in order.
///
/// Spans never overlap. Trailing sentence punctuation is not part of a span.
pub fn find_video_links(text: &str) -> Vec<VideoLink> {
    URL_CANDIDATE
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
            match parse_video_url(raw) {
                Some(reference) => Some(VideoLink {
                    span: m.start()..m.start() + raw.len(),
                    reference,
                }),
                None => {
                    tracing::debug!(candidate = raw, "skipping unrecognized YouTube link");
                    None
                }
            }
        })
        .collect()
}

/// Parse a single URL into a reference. Returns `None` for anything that is
/// not a link to one specific video.
pub fn parse_video_url(url: &str) -> Option<VideoReference> {
    let url = url.trim();
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("HTTPS://"))
        .or_else(|| url.strip_prefix("HTTP://"))
        .unwrap_or(url);

    let (host, rest) = without_scheme.split_once('/')?;
    let host = host.to_ascii_lowercase();

    let (before_fragment, fragment) = match rest.split_once('#') {
        Some((a, b)) => (a, Some(b)),
        None => (rest, None),
    };
    let (path, query) = match before_fragment.split_once('?') {
        Some((a, b)) => (a, b),
        None => (before_fragment, ""),
    };
    let params = parse_query(query);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let id = if host == "youtu.be" || host.ends_with(".youtu.be") {
        segments.first().copied()?.to_string()
    } else if host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com")
    {
        match segments.as_slice() {
            ["watch"] => params
                .iter()
                .find(|(k, _)| *k == "v")
                .map(|(_, v)| v.to_string())?,
            ["shorts" | "embed" | "v" | "live", id, ..] => id.to_string(),
            _ => return None,
        }
    } else {
        return None;
    };

    let start = params
        .iter()
        .find(|(k, _)| *k == "t" || *k == "start")
        .and_then(|(_, v)| parse_timestamp(v))
        .or_else(|| fragment.and_then(parse_fragment_timestamp));

    VideoReference::new(id, start).ok()
}

fn parse_query(query: &str) -> Vec<(&str, &str)> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

fn parse_fragment_timestamp(fragment: &str) -> Option<u64> {
    let value = fragment
        .strip_prefix("t=")
        .or_else(|| fragment.strip_prefix('t'))?;
    parse_timestamp(value)
}

/// Parse `90`, `90s`, `1m30s`, `1h2m3s` into seconds.
pub fn parse_timestamp(value: &str) -> Option<u64> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    let caps = TIMESTAMP.captures(&value)?;
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }
    let part = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(Some(0))
    };
    let hours = part(1)?;
    let minutes = part(2)?;
    let seconds = part(3)?;
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
