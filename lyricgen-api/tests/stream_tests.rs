//! Live feed (SSE) integration tests

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use lyricgen_common::LiveEvent;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_end_to_end_stream_then_complete() {
    let (app, pool) = test_app(texts(&E2E_FRAGMENTS)).await;

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("two lines"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let events = read_events(response).await;

    assert_eq!(content_text(&events), "line one\nline two\n");
    let content_events = events.iter().filter(|e| !e.is_terminal()).count();
    assert_eq!(content_events, "line one\nline two\n".chars().count());

    let terminal: Vec<&LiveEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match events.last() {
        Some(LiveEvent::Complete { data }) => {
            assert_eq!(data.generated_lyrics, "line one\nline two");
            assert_eq!(data.generated_titles, vec!["A", "B"]);
            assert_eq!(data.theme, "two lines");
        }
        other => panic!("Expected complete event last, got {:?}", other),
    }

    assert_eq!(lyrics_count(&pool).await, 1);
}

#[tokio::test]
async fn test_frames_are_plain_data_lines() {
    let (app, _pool) = test_app(texts(&E2E_FRAGMENTS)).await;

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("raw"))).await;
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.starts_with("data: {\"type\":\"content\",\"chunk\":\"l\"}\n\n"));
    assert!(text.ends_with("\n\n"));
    assert!(text.contains("data: {\"type\":\"complete\""));
}

#[tokio::test]
async fn test_missing_end_sentinel_stops_at_payload_brace() {
    let (app, pool) = test_app(texts(&[
        "Sure!\nLYRICS_START\n",
        "first line\nsecond line\n",
        "{\"lyrics\": \"first line\\nsecond line\", \"titles\": \"Morning・Night\"}",
    ]))
    .await;

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("day"))).await;
    let events = read_events(response).await;

    assert_eq!(content_text(&events), "first line\nsecond line\n");
    match events.last() {
        Some(LiveEvent::Complete { data }) => {
            assert_eq!(data.generated_titles, vec!["Morning", "Night"]);
        }
        other => panic!("Expected complete event, got {:?}", other),
    }
    assert_eq!(lyrics_count(&pool).await, 1);
}

#[tokio::test]
async fn test_upstream_failure_sends_error_event() {
    let (app, pool) = test_app(vec![
        Step::Text("LYRICS_START\nhalf a line".to_string()),
        Step::Fail("connection reset by peer".to_string()),
    ])
    .await;

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("cut"))).await;
    let events = read_events(response).await;

    assert_eq!(
        events.last(),
        Some(&LiveEvent::Error {
            error: "Generation failed".to_string()
        })
    );
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(lyrics_count(&pool).await, 0);
}

#[tokio::test]
async fn test_garbage_output_closes_silently() {
    let (app, pool) = test_app(texts(&["I'm not able ", "to help with that."])).await;

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("nope"))).await;
    let events = read_events(response).await;

    assert!(events.is_empty());
    assert_eq!(lyrics_count(&pool).await, 0);
}

#[tokio::test]
async fn test_store_failure_withholds_complete() {
    let pool = test_pool().await;
    let source = Arc::new(ScriptedTokenSource::new(texts(&E2E_FRAGMENTS)));
    let state = test_state(pool.clone(), source)
        .with_store(Arc::new(FailingInsertStore::new(pool.clone())));
    let app = lyricgen_api::build_router(state);

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("lost"))).await;
    let events = read_events(response).await;

    assert_eq!(content_text(&events), "line one\nline two\n");
    assert!(events.iter().all(|e| !e.is_terminal()));
    assert_eq!(lyrics_count(&pool).await, 0);
}

#[tokio::test]
async fn test_disconnect_while_waiting_on_upstream_releases_source() {
    let pool = test_pool().await;
    let source = Arc::new(ScriptedTokenSource::new(vec![
        Step::Text("LYRICS_START\n".to_string()),
        Step::Stall,
    ]));
    let app = lyricgen_api::build_router(test_state(pool.clone(), source.clone()));

    let response = send(&app, json_request("POST", "/api/lyrics/stream", generate_body("gone"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Upstream is stalled, so the session keeps its subscription open
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(!source.is_released());

    drop(response);

    let released = tokio::time::timeout(Duration::from_secs(2), async {
        while !source.is_released() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "token stream still held after client disconnect");
    assert_eq!(lyrics_count(&pool).await, 0);
}
