//! Configuration
//!
//! `Settings` is the option surface the host exposes in its function
//! settings panel. `GenerationConfig` is the immutable per-request value the
//! pipeline actually reads; it is derived from `Settings` and never mutated.

use crate::error::{Result, VideoError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_VIDEO_FPS: f64 = 1.0;
/// Per-request video cap of the provider.
pub const MAX_VIDEOS_PER_REQUEST: usize = 10;

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_video_fps() -> f64 {
    DEFAULT_VIDEO_FPS
}
fn default_max_videos() -> usize {
    MAX_VIDEOS_PER_REQUEST
}
fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Host-facing settings ("valves").
///
/// Deserializes from the host's JSON using the upper-case option names.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Google AI Studio API key
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub gemini_api_key: SecretString,

    /// Model used when the host does not name one
    #[serde(default = "default_model")]
    #[validate(length(min = 1))]
    pub default_model: String,

    /// Base URL of the generative language API
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub api_base_url: String,

    /// Attach native video parts (and images) to requests
    #[serde(default = "default_true")]
    pub enable_vision: bool,

    /// Scan text messages for YouTube links
    #[serde(default = "default_true")]
    pub auto_detect_youtube: bool,

    /// Frame sampling rate for native video parts
    #[serde(default = "default_video_fps")]
    #[validate(range(exclusive_min = 0.0))]
    pub default_video_fps: f64,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    /// Maximum number of videos attached to a single request
    #[serde(default = "default_max_videos")]
    #[validate(range(min = 1, max = 10))]
    pub max_videos: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: empty_secret(),
            default_model: default_model(),
            api_base_url: default_base_url(),
            enable_vision: true,
            auto_detect_youtube: true,
            default_video_fps: DEFAULT_VIDEO_FPS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_videos: MAX_VIDEOS_PER_REQUEST,
        }
    }
}

impl Settings {
    /// Parse settings from the host's JSON object and validate them.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| VideoError::ConfigurationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = read("GEMINI_API_KEY") {
            settings.gemini_api_key = SecretString::from(key);
        }
        if let Some(model) = read("DEFAULT_MODEL") {
            settings.default_model = model;
        }
        if let Some(url) = read("API_BASE_URL") {
            settings.api_base_url = url;
        }
        if let Some(v) = read("ENABLE_VISION") {
            settings.enable_vision = parse_env("ENABLE_VISION", &v)?;
        }
        if let Some(v) = read("AUTO_DETECT_YOUTUBE") {
            settings.auto_detect_youtube = parse_env("AUTO_DETECT_YOUTUBE", &v)?;
        }
        if let Some(v) = read("DEFAULT_VIDEO_FPS") {
            settings.default_video_fps = parse_env("DEFAULT_VIDEO_FPS", &v)?;
        }
        if let Some(v) = read("MAX_TOKENS") {
            settings.max_tokens = parse_env("MAX_TOKENS", &v)?;
        }
        if let Some(v) = read("TEMPERATURE") {
            settings.temperature = parse_env("TEMPERATURE", &v)?;
        }
        if let Some(v) = read("MAX_VIDEOS") {
            settings.max_videos = parse_env("MAX_VIDEOS", &v)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn api_key(&self) -> &str {
        self.gemini_api_key.expose_secret()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key().trim().is_empty()
    }

    /// Build the per-request generation config from these settings.
    pub fn generation_config(&self) -> Result<GenerationConfig> {
        GenerationConfig::builder()
            .temperature(self.temperature)
            .max_output_tokens(self.max_tokens)
            .video_fps(self.default_video_fps)
            .enable_vision(self.enable_vision)
            .auto_detect_youtube(self.auto_detect_youtube)
            .max_videos(self.max_videos)
            .build()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| VideoError::ConfigurationError(format!("{key} has an invalid value: {value}")))
}

/// Immutable generation parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    video_fps: f64,
    enable_vision: bool,
    auto_detect_youtube: bool,
    max_videos: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_TOKENS,
            video_fps: DEFAULT_VIDEO_FPS,
            enable_vision: true,
            auto_detect_youtube: true,
            max_videos: MAX_VIDEOS_PER_REQUEST,
        }
    }
}

impl GenerationConfig {
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::new()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn video_fps(&self) -> f64 {
        self.video_fps
    }

    pub fn enable_vision(&self) -> bool {
        self.enable_vision
    }

    pub fn auto_detect_youtube(&self) -> bool {
        self.auto_detect_youtube
    }

    pub fn max_videos(&self) -> usize {
        self.max_videos
    }
}

/// Builder for [`GenerationConfig`]; `build` enforces the value ranges.
#[derive(Debug, Clone)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GenerationConfig::default(),
        }
    }

    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub const fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = tokens;
        self
    }

    pub const fn video_fps(mut self, fps: f64) -> Self {
        self.config.video_fps = fps;
        self
    }

    pub const fn enable_vision(mut self, enable: bool) -> Self {
        self.config.enable_vision = enable;
        self
    }

    pub const fn auto_detect_youtube(mut self, enable: bool) -> Self {
        self.config.auto_detect_youtube = enable;
        self
    }

    pub const fn max_videos(mut self, max: usize) -> Self {
        self.config.max_videos = max;
        self
    }

    pub fn build(self) -> Result<GenerationConfig> {
        let c = self.config;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(VideoError::InvalidInput(format!(
                "temperature must be within [0, 2], got {}",
                c.temperature
            )));
        }
        if c.max_output_tokens == 0 {
            return Err(VideoError::InvalidInput(
                "maxOutputTokens must be positive".to_string(),
            ));
        }
        if !(c.video_fps.is_finite() && c.video_fps > 0.0) {
            return Err(VideoError::InvalidInput(format!(
                "videoFps must be positive, got {}",
                c.video_fps
            )));
        }
        if c.max_videos == 0 || c.max_videos > MAX_VIDEOS_PER_REQUEST {
            return Err(VideoError::InvalidInput(format!(
                "max videos must be within 1..={MAX_VIDEOS_PER_REQUEST}, got {}",
                c.max_videos
            )));
        }
        Ok(c)
    }
}

impl Default for GenerationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent timeouts for each network phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per-request bound for metadata and transcript retrieval
    pub metadata_fetch: Duration,
    /// Bound on establishing the streaming connection and receiving headers
    pub stream_connect: Duration,
    /// Overall bound on a single generation, first byte to last
    pub max_generation: Duration,
    /// Bound on thumbnail download for the summary tool
    pub thumbnail_fetch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            metadata_fetch: Duration::from_secs(5),
            stream_connect: Duration::from_secs(30),
            max_generation: Duration::from_secs(300),
            thumbnail_fetch: Duration::from_secs(5),
        }
    }
}
