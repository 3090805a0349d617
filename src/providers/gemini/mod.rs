//! Google Gemini provider
//!
//! - `types`: REST wire types
//! - `convert`: host chat format to Gemini contents
//! - `payload`: request payload assembly
//! - `streaming`: SSE event conversion
//! - `client`: HTTP client

pub mod client;
pub mod convert;
pub mod payload;
pub mod streaming;
pub mod types;

pub use client::{GeminiClient, Generation};
pub use convert::{ChatTurn, ContentPart, MediaUrl, MessageContent, Role};
pub use payload::{PayloadAssembler, RequestPayload, VideoAttachment};
pub use streaming::GeminiEventConverter;
