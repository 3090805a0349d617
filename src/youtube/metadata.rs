//! Video metadata and transcript retrieval.
//!
//! Metadata comes from three read-only platform endpoints:
//! - oEmbed for title, channel and thumbnail
//! - the watch page's embedded player response for duration, views,
//!   description, publish date and the caption track list
//! - the selected caption track in `json3` format for the transcript
//!
//! Only the oEmbed call is required. Everything else degrades to `None`.

use super::detector::VideoReference;
use super::transcript::{self, CaptionTrack, TranscriptSegment};
use crate::config::Timeouts;
use crate::error::{Result, VideoError};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Everything known about one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: u64,
    /// `None` when captions are disabled, restricted or could not be fetched
    pub transcript: Option<Vec<TranscriptSegment>>,
    pub description: Option<String>,
    pub view_count: Option<u64>,
    pub publish_date: Option<NaiveDate>,
    pub thumbnail_url: String,
    /// True when built from the reference alone because the platform was unreachable
    pub fallback: bool,
}

impl VideoMetadata {
    /// Placeholder metadata used when the platform cannot be reached.
    pub fn fallback(reference: &VideoReference) -> Self {
        Self {
            video_id: reference.video_id().to_string(),
            title: "YouTube Video".to_string(),
            channel: "Unknown Channel".to_string(),
            duration_seconds: 0,
            transcript: None,
            description: None,
            view_count: None,
            publish_date: None,
            thumbnail_url: reference.thumbnail_url(),
            fallback: true,
        }
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Transcript as plain text, clipped to `max_chars`.
    pub fn transcript_text(&self, max_chars: usize) -> Option<String> {
        self.transcript
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| transcript::transcript_text(t, max_chars))
    }

    /// Transcript with `[m:ss]` cue times, clipped to `max_chars`.
    pub fn timestamped_transcript(&self, max_chars: usize) -> Option<String> {
        self.transcript
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| transcript::timestamped_text(t, max_chars))
    }

    pub fn duration_label(&self) -> String {
        transcript::format_clock(self.duration_seconds)
    }
}

/// Downloaded thumbnail image.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Source of video metadata. The pipeline only talks to this trait so hosts
/// and tests can substitute their own.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for one video.
    ///
    /// A missing transcript is not an error: the result carries
    /// `transcript = None`. `Err` is always [`VideoError::DataUnavailable`].
    async fn fetch_metadata(&self, reference: &VideoReference) -> Result<VideoMetadata>;

    /// Download a thumbnail image.
    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail>;
}

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base URL for oEmbed and watch pages
    pub base_url: String,
    /// Preferred caption language
    pub language: String,
    pub timeouts: Timeouts,
    /// Total time allowed for retrying transient platform failures
    pub retry_window: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: YOUTUBE_BASE_URL.to_string(),
            language: "en".to_string(),
            timeouts: Timeouts::default(),
            retry_window: Duration::from_millis(1000),
        }
    }
}

impl FetcherConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry_window(mut self, window: Duration) -> Self {
        self.retry_window = window;
        self
    }
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: String,
    author_name: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Fields read from the watch page's `ytInitialPlayerResponse`.
#[derive(Debug, Default)]
struct PlayerDetails {
    duration_seconds: Option<u64>,
    view_count: Option<u64>,
    description: Option<String>,
    publish_date: Option<NaiveDate>,
    playable: bool,
    caption_tracks: Vec<CaptionTrack>,
}

/// YouTube-backed [`MetadataSource`].
#[derive(Debug, Clone)]
pub struct YouTubeMetadataFetcher {
    config: FetcherConfig,
    http_client: reqwest::Client,
}

impl YouTubeMetadataFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeouts.metadata_fetch)
            .user_agent(concat!("gemini-video/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VideoError::ConfigurationError(format!("http client: {e}")))?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: FetcherConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// GET with retries on transient failures (transport errors, 429, 5xx).
    async fn get_text(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(self.config.retry_window))
            .build();

        backoff::future::retry(policy, || async {
            let response = self
                .http_client
                .get(url)
                .header("Accept-Language", &self.config.language)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(FetchFailure::Transport(e.to_string())))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .text()
                    .await
                    .map_err(|e| backoff::Error::transient(FetchFailure::Transport(e.to_string())));
            }
            let failure = FetchFailure::Status(status.as_u16());
            if status.as_u16() == 429 || status.is_server_error() {
                Err(backoff::Error::transient(failure))
            } else {
                Err(backoff::Error::permanent(failure))
            }
        })
        .await
    }

    async fn fetch_oembed(&self, reference: &VideoReference) -> Result<OEmbed> {
        let url = format!(
            "{}/oembed?url={}&format=json",
            self.config.base_url,
            urlencoding::encode(&reference.watch_url())
        );
        let body = self.get_text(&url).await.map_err(|failure| {
            VideoError::unavailable(reference.video_id(), failure.reason())
        })?;
        serde_json::from_str(&body).map_err(|e| {
            VideoError::unavailable(reference.video_id(), format!("unreadable oEmbed response: {e}"))
        })
    }

    async fn fetch_player_details(&self, reference: &VideoReference) -> Option<PlayerDetails> {
        let url = format!("{}/watch?v={}", self.config.base_url, reference.video_id());
        match self.get_text(&url).await {
            Ok(html) => {
                let details = extract_player_response(&html).map(|v| parse_player_details(&v));
                if details.is_none() {
                    tracing::debug!(video_id = reference.video_id(), "no player response on watch page");
                }
                details
            }
            Err(failure) => {
                tracing::debug!(
                    video_id = reference.video_id(),
                    reason = %failure.reason(),
                    "watch page unavailable"
                );
                None
            }
        }
    }

    async fn fetch_transcript(
        &self,
        reference: &VideoReference,
        tracks: &[CaptionTrack],
    ) -> Option<Vec<TranscriptSegment>> {
        let track = transcript::select_track(tracks, &self.config.language)?;
        let separator = if track.base_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}fmt=json3", track.base_url, separator);

        let body = match self.get_text(&url).await {
            Ok(body) => body,
            Err(failure) => {
                tracing::info!(
                    video_id = reference.video_id(),
                    reason = %failure.reason(),
                    "transcript unavailable"
                );
                return None;
            }
        };
        match transcript::parse_json3(&body) {
            Ok(segments) if !segments.is_empty() => Some(segments),
            Ok(_) => None,
            Err(e) => {
                tracing::info!(video_id = reference.video_id(), error = %e, "transcript unreadable");
                None
            }
        }
    }
}

#[async_trait]
impl MetadataSource for YouTubeMetadataFetcher {
    async fn fetch_metadata(&self, reference: &VideoReference) -> Result<VideoMetadata> {
        let oembed = self.fetch_oembed(reference).await?;
        let details = self.fetch_player_details(reference).await.unwrap_or_default();

        let transcript = if !details.playable {
            None
        } else if details.caption_tracks.is_empty() {
            tracing::info!(video_id = reference.video_id(), "captions disabled");
            None
        } else {
            self.fetch_transcript(reference, &details.caption_tracks).await
        };

        Ok(VideoMetadata {
            video_id: reference.video_id().to_string(),
            title: oembed.title,
            channel: oembed.author_name,
            duration_seconds: details.duration_seconds.unwrap_or(0),
            transcript,
            description: details.description,
            view_count: details.view_count,
            publish_date: details.publish_date,
            thumbnail_url: oembed
                .thumbnail_url
                .unwrap_or_else(|| reference.thumbnail_url()),
            fallback: false,
        })
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail> {
        let response = self
            .http_client
            .get(url)
            .timeout(self.config.timeouts.thumbnail_fetch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(VideoError::unavailable(
                url,
                format!("thumbnail returned HTTP {}", response.status().as_u16()),
            ));
        }
        let bytes = response.bytes().await?.to_vec();
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| VideoError::unavailable(url, "thumbnail is not an image"))?
            .to_string();
        Ok(Thumbnail { bytes, mime_type })
    }
}

#[derive(Debug, Clone)]
enum FetchFailure {
    Transport(String),
    Status(u16),
}

impl FetchFailure {
    fn reason(&self) -> String {
        match self {
            Self::Transport(msg) => format!("platform unreachable: {msg}"),
            Self::Status(401 | 403) => "video not public".to_string(),
            Self::Status(404) => "video not found".to_string(),
            Self::Status(429) => "rate limited by platform".to_string(),
            Self::Status(code) => format!("platform returned HTTP {code}"),
        }
    }
}

/// Locate and decode the `ytInitialPlayerResponse` object in a watch page.
fn extract_player_response(html: &str) -> Option<Value> {
    const MARKER: &str = "ytInitialPlayerResponse";
    let start = html.find(MARKER)?;
    let after = &html[start + MARKER.len()..];
    let brace = after.find('{')?;
    let json = &after[brace..];
    serde_json::Deserializer::from_str(json)
        .into_iter::<Value>()
        .next()?
        .ok()
}

fn parse_player_details(player: &Value) -> PlayerDetails {
    let details = &player["videoDetails"];
    let as_u64 = |v: &Value| v.as_str().and_then(|s| s.parse::<u64>().ok()).or_else(|| v.as_u64());

    let caption_tracks = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
        .as_array()
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|t| serde_json::from_value::<CaptionTrack>(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    PlayerDetails {
        duration_seconds: as_u64(&details["lengthSeconds"]),
        view_count: as_u64(&details["viewCount"]),
        description: details["shortDescription"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        publish_date: player["microformat"]["playerMicroformatRenderer"]["publishDate"]
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()),
        playable: player["playabilityStatus"]["status"]
            .as_str()
            .map(|s| s == "OK")
            .unwrap_or(true),
        caption_tracks,
    }
}
