//! # gemini-video - YouTube-aware video understanding for chat hosts
//!
//! Adds native Gemini video understanding to a chat host. Each chat turn
//! runs the same pipeline:
//!
//! 1. detect YouTube links in the message ([`youtube::detector`])
//! 2. fetch title, channel, duration and transcript ([`youtube::metadata`])
//! 3. assemble the multimodal request ([`providers::gemini::payload`])
//! 4. stream the answer back over SSE ([`providers::gemini::client`])
//!
//! A message without links is sent as a plain text generation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_video::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), VideoError> {
//!     let settings = Settings::from_env()?;
//!     let pipe = VideoPipe::new(&settings)?;
//!     let config = settings.generation_config()?;
//!
//!     let mut sink = CollectingSink::new();
//!     let request = ChatRequest::new("Summarize https://youtu.be/dQw4w9WgXcQ?t=30");
//!     let text = pipe
//!         .chat_turn(&request, &config, &mut sink, CancelHandle::new())
//!         .await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod providers;
pub mod retry;
pub mod stream;
pub mod utils;
pub mod youtube;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::{GenerationConfig, Settings, Timeouts};
    pub use crate::error::{Result, VideoError};
    pub use crate::orchestrator::{
        ChatRequest, CollectingSink, OutputSink, StatusEvent, SummaryMethod, VideoPipe,
        VideoSummary,
    };
    pub use crate::providers::gemini::{
        ChatTurn, ContentPart, GeminiClient, MessageContent, RequestPayload, Role,
    };
    pub use crate::stream::{ChunkStream, FinishReason, StreamChunk};
    pub use crate::utils::CancelHandle;
    pub use crate::youtube::{MetadataSource, VideoMetadata, VideoReference, detect_videos};
}

pub use error::{Result, VideoError};
pub use orchestrator::VideoPipe;

static_assertions::assert_impl_all!(orchestrator::VideoPipe: Send, Sync);
static_assertions::assert_impl_all!(providers::gemini::GeminiClient: Send, Sync, Clone);
static_assertions::assert_impl_all!(youtube::YouTubeMetadataFetcher: Send, Sync);
static_assertions::assert_impl_all!(error::VideoError: Send, Sync, Clone);
