//! Cancellation and deadline behaviour of in-flight generations

use std::time::Duration;

use futures_util::StreamExt;
use gemini_video::config::Timeouts;
use gemini_video::error::VideoError;
use gemini_video::providers::gemini::types::{Content, GenerateContentRequest, Part};
use gemini_video::utils::CancelHandle;
use wiremock::MockServer;

use crate::support;

fn request() -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text("Describe the video")])],
        generation_config: None,
    }
}

#[tokio::test]
async fn cancel_after_first_chunk_ends_stream_and_closes_connection() {
    let (base, closed) = support::spawn_stalling_server();
    let client = support::client_for_base(&base);
    let cancel = CancelHandle::new();

    let mut stream = client
        .stream_request(&request(), cancel.clone())
        .await
        .expect("stream opens");

    let first = stream.next().await.expect("first chunk").expect("ok chunk");
    assert_eq!(first.delta_text, "Hello");
    assert!(!first.is_final);

    cancel.cancel();
    assert!(stream.next().await.is_none());
    drop(stream);

    let closed = tokio::task::spawn_blocking(move || closed.recv_timeout(Duration::from_secs(6)))
        .await
        .unwrap();
    assert_eq!(closed, Ok(true));
}

#[tokio::test]
async fn cancelled_before_connect_returns_cancelled() {
    let server = MockServer::start().await;
    let cancel = CancelHandle::new();
    cancel.cancel();

    let result = support::client(&server)
        .stream_request(&request(), cancel)
        .await;
    assert!(matches!(result, Err(VideoError::Cancelled)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn child_handle_follows_parent() {
    let parent = CancelHandle::new();
    let child = parent.child();
    parent.cancel();
    assert!(child.is_cancelled());
}

#[tokio::test]
async fn stalled_stream_hits_generation_deadline() {
    let (base, _closed) = support::spawn_stalling_server();
    let client = support::client_for_base(&base).with_timeouts(Timeouts {
        max_generation: Duration::from_millis(500),
        ..Timeouts::default()
    });

    let mut stream = client
        .stream_request(&request(), CancelHandle::new())
        .await
        .expect("stream opens");

    let first = stream.next().await.expect("first chunk").expect("ok chunk");
    assert_eq!(first.delta_text, "Hello");

    match stream.next().await {
        Some(Err(VideoError::TimeoutError(message))) => {
            assert!(message.contains("maximum duration"));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}
