//! Core error types.

use serde_json::Value;
use thiserror::Error;

/// Inline request body limit of the Gemini API (bytes).
pub const INLINE_PAYLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Errors produced anywhere in the video pipeline.
#[derive(Error, Debug, Clone)]
pub enum VideoError {
    /// Malformed user input (URL, prompt, content part)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No API key was configured
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// Video metadata or transcript could not be retrieved
    #[error("Data unavailable for video {video_id}: {reason}")]
    DataUnavailable { video_id: String, reason: String },

    /// The provider rejected the API key
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Rate or quota limit reached at the provider
    #[error("Quota exceeded: {0}")]
    QuotaExceededError(String),

    /// Request body or inline media above the provider's inline limit
    #[error("Payload too large ({size} bytes, limit {limit} bytes)")]
    PayloadTooLargeError { size: usize, limit: usize },

    /// Provider-side failure (5xx, safety block, unexpected status)
    #[error("Provider error ({code}): {message}")]
    ProviderError {
        code: u16,
        message: String,
        details: Option<Value>,
    },

    /// Connection level failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A timeout elapsed (connect, fetch or overall generation)
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The SSE stream broke mid-response
    #[error("Stream error: {0}")]
    StreamError(String),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse classification used for recovery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input or configuration, recovered locally
    Input,
    /// Missing metadata or transcript, recovered locally
    DataUnavailable,
    /// Rejected by the provider, surfaced to the user
    Provider,
    /// Transport failure
    Network,
    /// User-initiated stop
    Cancellation,
    /// Decoding failures and other internal faults
    Internal,
}

impl VideoError {
    /// Create a provider error from a status code and message.
    pub fn provider(code: u16, message: impl Into<String>) -> Self {
        Self::ProviderError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a data-unavailable error for a video.
    pub fn unavailable(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            video_id: video_id.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) | Self::ConfigurationError(_) | Self::MissingApiKey(_) => {
                ErrorCategory::Input
            }
            Self::DataUnavailable { .. } => ErrorCategory::DataUnavailable,
            Self::AuthenticationError(_)
            | Self::QuotaExceededError(_)
            | Self::PayloadTooLargeError { .. }
            | Self::ProviderError { .. } => ErrorCategory::Provider,
            Self::NetworkError(_) | Self::TimeoutError(_) => ErrorCategory::Network,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::ParseError(_) | Self::StreamError(_) => ErrorCategory::Internal,
        }
    }

    /// Only transport failures are retried; provider answers never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }

    /// HTTP status associated with the error, when known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthenticationError(_) => Some(401),
            Self::QuotaExceededError(_) => Some(429),
            Self::PayloadTooLargeError { .. } => Some(413),
            Self::ProviderError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Short human-readable reason, free of diagnostic detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => format!("Invalid input: {msg}"),
            Self::ConfigurationError(msg) => format!("Invalid configuration: {msg}"),
            Self::MissingApiKey(_) => {
                "GEMINI_API_KEY is required. Please set your Gemini API key in the function settings."
                    .to_string()
            }
            Self::DataUnavailable { .. } => "Video not public or metadata unavailable".to_string(),
            Self::AuthenticationError(_) => "Invalid or missing Gemini API key".to_string(),
            Self::QuotaExceededError(_) => "API quota exceeded, please try again later".to_string(),
            Self::PayloadTooLargeError { limit, .. } => format!(
                "Video is too large to send inline (limit {} MB)",
                limit / (1024 * 1024)
            ),
            Self::ProviderError { code, message, .. } => {
                if message.to_ascii_lowercase().contains("safety") {
                    "The response was blocked by the provider's safety filters".to_string()
                } else if *code >= 500 {
                    "Gemini service is temporarily unavailable".to_string()
                } else {
                    format!("Gemini rejected the request (HTTP {code})")
                }
            }
            Self::NetworkError(_) => "Could not reach the Gemini API".to_string(),
            Self::TimeoutError(_) => "The request timed out".to_string(),
            Self::ParseError(_) | Self::StreamError(_) => {
                "Received an unreadable response from Gemini".to_string()
            }
            Self::Cancelled => "Generation stopped".to_string(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VideoError>;
