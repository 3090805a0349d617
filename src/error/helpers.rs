//! Error helper utilities.
//!
//! Classification of provider HTTP failures plus structured summaries
//! suitable for rendering in the host chat UI.

use super::types::{ErrorCategory, VideoError};
use serde::Deserialize;

/// Gemini JSON error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Map a non-success HTTP response to a typed error.
pub fn classify_http_error(status: u16, body: &str) -> VideoError {
    let parsed = serde_json::from_str::<GeminiErrorEnvelope>(body).ok();
    let details = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let provider_status = parsed
        .as_ref()
        .and_then(|e| e.error.status.clone())
        .unwrap_or_default();
    let lower = message.to_ascii_lowercase();

    match status {
        401 => VideoError::AuthenticationError(message),
        403 if provider_status == "PERMISSION_DENIED" || lower.contains("api key") => {
            VideoError::AuthenticationError(message)
        }
        400 if lower.contains("api key not valid") || provider_status == "UNAUTHENTICATED" => {
            VideoError::AuthenticationError(message)
        }
        429 => VideoError::QuotaExceededError(message),
        _ if provider_status == "RESOURCE_EXHAUSTED" => VideoError::QuotaExceededError(message),
        413 => VideoError::PayloadTooLargeError {
            size: 0,
            limit: super::INLINE_PAYLOAD_LIMIT_BYTES,
        },
        400 if lower.contains("request payload size exceeds") || lower.contains("too large") => {
            VideoError::PayloadTooLargeError {
                size: 0,
                limit: super::INLINE_PAYLOAD_LIMIT_BYTES,
            }
        }
        code => VideoError::ProviderError {
            code,
            message,
            details,
        },
    }
}

/// Presentation kind (coarse-grained).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Quota,
    PayloadTooLarge,
    Provider,
    Network,
    Input,
    DataUnavailable,
    Cancelled,
    Unknown,
}

/// Structured error summary for host/UI consumption.
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    /// User-facing reason
    pub message: String,
    /// Diagnostic text, not meant for end users
    pub diagnosis: String,
    pub suggestions: Vec<String>,
}

pub fn map_error_kind(err: &VideoError) -> ErrorKind {
    match err {
        VideoError::AuthenticationError(_) | VideoError::MissingApiKey(_) => ErrorKind::Auth,
        VideoError::QuotaExceededError(_) => ErrorKind::Quota,
        VideoError::PayloadTooLargeError { .. } => ErrorKind::PayloadTooLarge,
        VideoError::ProviderError { .. } => ErrorKind::Provider,
        VideoError::Cancelled => ErrorKind::Cancelled,
        _ => match err.category() {
            ErrorCategory::Network => ErrorKind::Network,
            ErrorCategory::Input => ErrorKind::Input,
            ErrorCategory::DataUnavailable => ErrorKind::DataUnavailable,
            _ => ErrorKind::Unknown,
        },
    }
}

pub fn suggest_fixes(err: &VideoError) -> Vec<String> {
    let mut tips = Vec::new();
    match map_error_kind(err) {
        ErrorKind::Auth => {
            tips.push("Verify GEMINI_API_KEY in the function settings".to_string());
            tips.push("Create a key at https://aistudio.google.com/".to_string());
        }
        ErrorKind::Quota => {
            tips.push("Wait a moment and retry, or reduce request rate".to_string());
            tips.push("Check the quota page of your Google AI Studio project".to_string());
        }
        ErrorKind::PayloadTooLarge => {
            tips.push("Use a YouTube link or a shorter clip instead of inline video".to_string());
        }
        ErrorKind::Provider => {
            tips.push("Retry later; check the Gemini API status page".to_string());
        }
        ErrorKind::Network => {
            tips.push("Check network connectivity to generativelanguage.googleapis.com".to_string());
        }
        ErrorKind::Input => {
            tips.push("Check the URL and configuration values".to_string());
        }
        _ => {}
    }
    tips
}

pub fn summarize_error(err: &VideoError) -> ErrorSummary {
    ErrorSummary {
        kind: map_error_kind(err),
        status: err.status_code(),
        message: err.user_message(),
        diagnosis: err.to_string(),
        suggestions: suggest_fixes(err),
    }
}

/// Render a summary as text; `verbose` adds the diagnosis and suggestions.
pub fn format_summary(summary: &ErrorSummary, verbose: bool) -> String {
    let mut out = format!("Error: {}", summary.message);
    if verbose {
        if let Some(code) = summary.status {
            out.push_str(&format!("\nStatus: {code}"));
        }
        out.push_str(&format!("\nDetails: {}", summary.diagnosis));
        for tip in &summary.suggestions {
            out.push_str(&format!("\n- {tip}"));
        }
    }
    out
}
