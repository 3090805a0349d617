//! Shared helpers for integration tests: SSE fixtures, a mock Gemini
//! endpoint and an in-memory metadata source.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use gemini_video::error::VideoError;
use gemini_video::providers::gemini::GeminiClient;
use gemini_video::retry::ConnectRetry;
use gemini_video::stream::{ChunkStream, StreamChunk};
use gemini_video::youtube::{
    MetadataSource, Thumbnail, TranscriptSegment, VideoMetadata, VideoReference,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const MODEL: &str = "gemini-2.5-flash";

/// Raw contents of `tests/fixtures/gemini/<name>`.
pub fn fixture(name: &str) -> String {
    let path = format!(
        "{}/tests/fixtures/gemini/{name}",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {path}: {e}"))
        .replace("\r\n", "\n")
}

pub fn sse_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/event-stream")
}

pub fn stream_path(model: &str) -> String {
    format!("/v1beta/models/{model}:streamGenerateContent")
}

pub fn generate_path(model: &str) -> String {
    format!("/v1beta/models/{model}:generateContent")
}

/// Serve `body` as the SSE answer of `model`.
pub async fn mount_stream(server: &MockServer, model: &str, body: impl Into<String>) {
    Mock::given(method("POST"))
        .and(path(stream_path(model)))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(sse_response(body))
        .mount(server)
        .await;
}

pub fn fast_retry() -> ConnectRetry {
    ConnectRetry::new()
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(20))
        .with_jitter(false)
}

pub fn client_for_base(base: &str) -> GeminiClient {
    GeminiClient::new(API_KEY, MODEL)
        .expect("client")
        .with_base_url(format!("{base}/v1beta"))
        .with_connect_retry(fast_retry())
}

pub fn client(server: &MockServer) -> GeminiClient {
    client_for_base(&server.uri())
}

pub async fn collect(mut stream: ChunkStream) -> Vec<Result<StreamChunk, VideoError>> {
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item);
    }
    out
}

pub fn sample_metadata(video_id: &str, transcript: Option<&[(f64, &str)]>) -> VideoMetadata {
    VideoMetadata {
        video_id: video_id.to_string(),
        title: "Never Gonna Give You Up".to_string(),
        channel: "Rick Astley".to_string(),
        duration_seconds: 213,
        transcript: transcript.map(|lines| {
            lines
                .iter()
                .map(|(start, text)| TranscriptSegment {
                    start_seconds: *start,
                    text: text.to_string(),
                })
                .collect()
        }),
        description: Some("The official video".to_string()),
        view_count: Some(1_500_000_000),
        publish_date: None,
        thumbnail_url: format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg"),
        fallback: false,
    }
}

/// Metadata source answering from memory and counting calls.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    pub metadata: Option<VideoMetadata>,
    pub thumbnail: Option<Thumbnail>,
    /// Time each metadata answer takes
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticMetadata {
    pub fn new(metadata: Option<VideoMetadata>) -> Arc<Self> {
        Arc::new(Self {
            metadata,
            ..Self::default()
        })
    }

    pub fn with_thumbnail(metadata: Option<VideoMetadata>, thumbnail: Thumbnail) -> Arc<Self> {
        Arc::new(Self {
            metadata,
            thumbnail: Some(thumbnail),
            ..Self::default()
        })
    }

    pub fn slow(metadata: Option<VideoMetadata>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            metadata,
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn fetch_metadata(&self, reference: &VideoReference) -> Result<VideoMetadata, VideoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.metadata {
            Some(metadata) => Ok(VideoMetadata {
                video_id: reference.video_id().to_string(),
                ..metadata.clone()
            }),
            None => Err(VideoError::unavailable(
                reference.video_id(),
                "platform unreachable: test",
            )),
        }
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail, VideoError> {
        self.thumbnail
            .clone()
            .ok_or_else(|| VideoError::unavailable(url, "thumbnail is not an image"))
    }
}

/// Smallest valid PNG header, enough for content sniffing.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
];

pub const FIRST_EVENT: &str = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}],\"role\":\"model\"},\"index\":0}]}\n\n";

/// Serves one SSE event over a chunked response and then stalls. Reports
/// `true` once the client closes the connection.
pub fn spawn_stalling_server() -> (String, mpsc::Receiver<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else { return };
        let mut buf = [0u8; 8192];
        let _ = stream.read(&mut buf);

        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
        let chunk = format!("{:x}\r\n{FIRST_EVENT}\r\n", FIRST_EVENT.len());
        if stream.write_all(head.as_bytes()).is_err() || stream.write_all(chunk.as_bytes()).is_err() {
            return;
        }
        let _ = stream.flush();

        stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
        let closed = loop {
            match stream.read(&mut buf) {
                Ok(0) => break true,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => break true,
                Err(_) => break false,
            }
        };
        let _ = tx.send(closed);
    });
    (format!("http://{addr}"), rx)
}
