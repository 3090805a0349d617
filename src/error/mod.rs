//! Error Handling Module
//!
//! This module provides the error handling for the video pipeline, including:
//! - Core error types (`VideoError`, `ErrorCategory`)
//! - HTTP status classification for provider responses
//! - User-facing error summaries
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_video::error::{VideoError, ErrorCategory};
//!
//! let error = VideoError::QuotaExceededError("RESOURCE_EXHAUSTED".into());
//! assert_eq!(error.category(), ErrorCategory::Provider);
//! assert!(!error.is_retryable());
//! ```

mod conversions;
pub mod helpers;
pub mod types;

pub use helpers::*;
pub use types::*;
