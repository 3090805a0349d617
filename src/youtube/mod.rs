//! YouTube support: link detection, metadata and transcripts.

pub mod detector;
pub mod metadata;
pub mod transcript;

pub use detector::{
    DetectedVideo, VideoLink, VideoReference, detect_video_matches, detect_videos,
    detect_videos_capped, find_video_links, is_valid_video_id, parse_video_url,
};
pub use metadata::{
    FetcherConfig, MetadataSource, Thumbnail, VideoMetadata, YouTubeMetadataFetcher,
};
pub use transcript::TranscriptSegment;
