//! Gemini streaming fixtures tests

use gemini_video::error::VideoError;
use gemini_video::providers::gemini::types::{Content, GenerateContentRequest, Part};
use gemini_video::stream::{FinishReason, StreamChunk, collect_text};
use gemini_video::utils::CancelHandle;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support;

fn hello_request() -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text("Say hello")])],
        generation_config: None,
    }
}

async fn replay(fixture: &str) -> Vec<Result<StreamChunk, VideoError>> {
    let server = MockServer::start().await;
    support::mount_stream(&server, support::MODEL, support::fixture(fixture)).await;
    let stream = support::client(&server)
        .stream_request(&hello_request(), CancelHandle::new())
        .await
        .expect("stream opens");
    support::collect(stream).await
}

#[tokio::test]
async fn gemini_simple_text_then_finish_fixture() {
    let chunks: Vec<StreamChunk> = replay("simple_text_then_finish.sse")
        .await
        .into_iter()
        .map(|c| c.expect("chunk"))
        .collect();

    let text: String = chunks.iter().map(|c| c.delta_text.as_str()).collect();
    assert_eq!(text, "Hello, world!");
    assert_eq!(chunks.len(), 3);
    assert!(chunks[..2].iter().all(|c| !c.is_final));
    let last = chunks.last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn gemini_thought_parts_are_not_forwarded() {
    let chunks: Vec<StreamChunk> = replay("thought_then_text_stop.sse")
        .await
        .into_iter()
        .map(|c| c.expect("chunk"))
        .collect();

    let text: String = chunks.iter().map(|c| c.delta_text.as_str()).collect();
    assert_eq!(text, "The video shows a man singing.");
    assert!(!text.contains("Thinking"));
    assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
    assert_eq!(chunks.last().unwrap().finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn gemini_max_tokens_maps_to_length() {
    let chunks = replay("max_tokens.sse").await;
    let last = chunks.last().unwrap().as_ref().unwrap();
    assert!(last.is_final);
    assert_eq!(last.finish_reason, Some(FinishReason::Length));
    assert_eq!(last.delta_text, " the");
}

#[tokio::test]
async fn gemini_safety_stop_maps_to_safety() {
    let chunks = replay("safety_stop.sse").await;
    assert_eq!(chunks.len(), 2);
    let last = chunks[1].as_ref().unwrap();
    assert!(last.is_final);
    assert!(last.delta_text.is_empty());
    assert_eq!(last.finish_reason, Some(FinishReason::Safety));
}

#[tokio::test]
async fn gemini_stream_without_finish_reason_gets_final_chunk() {
    let chunks: Vec<StreamChunk> = replay("no_finish_reason.sse")
        .await
        .into_iter()
        .map(|c| c.expect("chunk"))
        .collect();

    assert_eq!(chunks.len(), 3);
    let last = chunks.last().unwrap();
    assert!(last.is_final);
    assert!(last.delta_text.is_empty());
    assert_eq!(last.finish_reason, None);
    let text: String = chunks.iter().map(|c| c.delta_text.as_str()).collect();
    assert_eq!(text, "Partial answer");
}

#[tokio::test]
async fn gemini_error_event_ends_stream_with_provider_error() {
    let chunks = replay("error_mid_stream.sse").await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].as_ref().unwrap().delta_text, "Starting");
    match &chunks[1] {
        Err(VideoError::ProviderError { code, message, .. }) => {
            assert_eq!(*code, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_blocked_prompt_is_reported() {
    let chunks = replay("prompt_blocked.sse").await;
    assert_eq!(chunks.len(), 1);
    match &chunks[0] {
        Err(VideoError::ProviderError { code, message, .. }) => {
            assert_eq!(*code, 400);
            assert!(message.contains("PROHIBITED_CONTENT"));
        }
        other => panic!("expected blocked prompt error, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_collect_text_returns_reason() {
    let server = MockServer::start().await;
    support::mount_stream(
        &server,
        support::MODEL,
        support::fixture("simple_text_then_finish.sse"),
    )
    .await;
    let stream = support::client(&server)
        .stream_request(&hello_request(), CancelHandle::new())
        .await
        .unwrap();
    let (text, reason) = collect_text(stream).await.unwrap();
    assert_eq!(text, "Hello, world!");
    assert_eq!(reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn generate_returns_text_and_finish_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(support::generate_path(support::MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "Thinking it over", "thought": true },
                    { "functionCall": { "name": "noop", "args": {} } },
                    { "text": "Hello there" }
                ]},
                "finishReason": "MAX_TOKENS"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generation = support::client(&server)
        .generate_request(&hello_request())
        .await
        .unwrap();

    assert_eq!(generation.text, "Hello there");
    assert_eq!(generation.finish_reason, Some(FinishReason::Length));
}
