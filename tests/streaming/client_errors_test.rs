//! HTTP error classification and retry boundaries of the streaming client

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gemini_video::error::VideoError;
use gemini_video::providers::gemini::types::{Content, GenerateContentRequest, Part};
use gemini_video::utils::CancelHandle;
use serde_json::json;
use tracing_test::traced_test;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support;

fn request() -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text("Describe the video")])],
        generation_config: None,
    }
}

fn error_body(code: u16, message: &str, status: &str) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message, "status": status } })
}

async fn open_with_status(server: &MockServer, template: ResponseTemplate, expected_calls: u64) -> VideoError {
    Mock::given(method("POST"))
        .and(path(support::stream_path(support::MODEL)))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;

    match support::client(server)
        .stream_request(&request(), CancelHandle::new())
        .await
    {
        Ok(_) => panic!("expected the stream to fail"),
        Err(e) => e,
    }
}

#[tokio::test]
#[traced_test]
async fn unauthorized_is_auth_error_and_not_retried() {
    let server = MockServer::start().await;
    let err = open_with_status(
        &server,
        ResponseTemplate::new(401).set_body_json(error_body(
            401,
            "API key not valid. Please pass a valid API key.",
            "UNAUTHENTICATED",
        )),
        1,
    )
    .await;

    assert!(matches!(err, VideoError::AuthenticationError(_)), "{err:?}");
    assert_eq!(err.user_message(), "Invalid or missing Gemini API key");
    assert!(!logs_contain("transient failure, retrying"));
}

#[tokio::test]
async fn bad_request_with_invalid_key_message_is_auth_error() {
    let server = MockServer::start().await;
    let err = open_with_status(
        &server,
        ResponseTemplate::new(400).set_body_json(error_body(
            400,
            "API key not valid. Please pass a valid API key.",
            "INVALID_ARGUMENT",
        )),
        1,
    )
    .await;
    assert!(matches!(err, VideoError::AuthenticationError(_)), "{err:?}");
}

#[tokio::test]
async fn rate_limit_is_quota_error() {
    let server = MockServer::start().await;
    let err = open_with_status(
        &server,
        ResponseTemplate::new(429).set_body_json(error_body(
            429,
            "Resource has been exhausted (e.g. check quota).",
            "RESOURCE_EXHAUSTED",
        )),
        1,
    )
    .await;
    assert!(matches!(err, VideoError::QuotaExceededError(_)), "{err:?}");
}

#[tokio::test]
async fn payload_too_large_is_reported() {
    let server = MockServer::start().await;
    let err = open_with_status(&server, ResponseTemplate::new(413), 1).await;
    assert!(matches!(err, VideoError::PayloadTooLargeError { .. }), "{err:?}");
    assert_eq!(err.status_code(), Some(413));
}

#[tokio::test]
async fn server_error_is_provider_error_without_retry() {
    let server = MockServer::start().await;
    let err = open_with_status(
        &server,
        ResponseTemplate::new(503).set_body_json(error_body(
            503,
            "The model is overloaded. Please try again later.",
            "UNAVAILABLE",
        )),
        1,
    )
    .await;

    match err {
        VideoError::ProviderError { code, message, .. } => {
            assert_eq!(code, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn api_key_travels_in_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(support::stream_path(support::MODEL)))
        .and(header("x-goog-api-key", support::API_KEY))
        .respond_with(support::sse_response(support::fixture(
            "simple_text_then_finish.sse",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let stream = support::client(&server)
        .stream_request(&request(), CancelHandle::new())
        .await
        .expect("stream opens");
    support::collect(stream).await;

    let received = server.received_requests().await.unwrap();
    assert!(!received[0].url.as_str().contains(support::API_KEY));
    assert_eq!(received[0].url.query(), Some("alt=sse"));
}

/// Accepts connections and closes them without answering.
fn spawn_dropping_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            counter.fetch_add(1, Ordering::SeqCst);
            stream
                .set_read_timeout(Some(Duration::from_millis(200)))
                .ok();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            drop(stream);
        }
    });
    (format!("http://{addr}"), accepted)
}

#[tokio::test]
#[traced_test]
async fn dropped_connection_is_retried_once_then_network_error() {
    let (base, accepted) = spawn_dropping_server();
    let client = support::client_for_base(&base);

    let err = match client.stream_request(&request(), CancelHandle::new()).await {
        Ok(_) => panic!("expected a network error"),
        Err(e) => e,
    };

    assert!(matches!(err, VideoError::NetworkError(_)), "{err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    assert!(logs_contain("transient failure, retrying"));
}

/// Sends the response head and one SSE event, then closes the socket
/// before the chunked body is terminated.
fn spawn_truncating_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            counter.fetch_add(1, Ordering::SeqCst);
            stream
                .set_read_timeout(Some(Duration::from_millis(150)))
                .ok();
            let mut buf = [0u8; 4096];
            while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}

            let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}]}}]}\n\n";
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
            let chunk = format!("{:x}\r\n{event}\r\n", event.len());
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(chunk.as_bytes());
            let _ = stream.flush();
            std::thread::sleep(Duration::from_millis(100));
            drop(stream);
        }
    });
    (format!("http://{addr}"), accepted)
}

#[tokio::test]
async fn connection_lost_after_headers_is_network_error_without_replay() {
    let (base, accepted) = spawn_truncating_server();
    let client = support::client_for_base(&base);

    let stream = client
        .stream_request(&request(), CancelHandle::new())
        .await
        .expect("stream opens");
    let items = support::collect(stream).await;

    assert_eq!(items.len(), 2, "{items:?}");
    assert_eq!(items[0].as_ref().expect("first chunk").delta_text, "Hello");
    assert!(
        matches!(items[1], Err(VideoError::NetworkError(_))),
        "{:?}",
        items[1]
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
