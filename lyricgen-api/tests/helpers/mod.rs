//! Shared helpers for lyricgen-api integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::StreamExt;
use http_body_util::BodyExt;
use lyricgen_api::services::{
    GenerationStore, LlmError, PacingPolicy, SegmenterConfig, SqliteGenerationStore, TokenSource,
    TokenStream,
};
use lyricgen_api::AppState;
use lyricgen_common::models::{LyricsRecord, NewLyrics, Persona};
use lyricgen_common::{LiveEvent, SseFrameDecoder};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Fragments of the end-to-end reference completion
pub const E2E_FRAGMENTS: [&str; 2] = [
    "LYRICS_ST",
    "ART\nline one\nline two\nLYRICS_END\n{\"lyrics\":\"line one\\nline two\",\"titles\":[\"A\",\"B\"]}",
];

/// One scripted upstream item
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Fail(String),
    /// Never yields again
    Stall,
}

pub fn texts(fragments: &[&str]) -> Vec<Step> {
    fragments.iter().map(|f| Step::Text(f.to_string())).collect()
}

/// Sets its flag when the owning stream is dropped
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Token source replaying a fixed script
pub struct ScriptedTokenSource {
    steps: Vec<Step>,
    ready: bool,
    pub calls: AtomicUsize,
    /// True once the last opened stream has been dropped
    pub released: Arc<AtomicBool>,
}

impl ScriptedTokenSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ready: true,
            calls: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Behaves like a source with no API key
    pub fn unconfigured() -> Self {
        Self {
            ready: false,
            ..Self::new(Vec::new())
        }
    }
}

impl TokenSource for ScriptedTokenSource {
    fn ensure_ready(&self) -> Result<(), LlmError> {
        if self.ready {
            Ok(())
        } else {
            Err(LlmError::MissingApiKey)
        }
    }

    fn stream_completion(&self, _prompt: String) -> TokenStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let steps = self.steps.clone();
        self.released.store(false, Ordering::SeqCst);
        let guard = ReleaseGuard(self.released.clone());

        Box::pin(async_stream::stream! {
            let _guard = guard;
            for step in steps {
                match step {
                    Step::Text(text) => yield Ok(text),
                    Step::Fail(msg) => {
                        yield Err(LlmError::Network(msg));
                        return;
                    }
                    Step::Stall => std::future::pending::<()>().await,
                }
            }
        })
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Store whose inserts always fail; reads go to SQLite
pub struct FailingInsertStore {
    inner: SqliteGenerationStore,
}

impl FailingInsertStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteGenerationStore::new(pool),
        }
    }
}

#[async_trait]
impl GenerationStore for FailingInsertStore {
    async fn base_rule(&self) -> lyricgen_common::Result<Option<String>> {
        self.inner.base_rule().await
    }

    async fn persona(&self, id: Uuid) -> lyricgen_common::Result<Option<Persona>> {
        self.inner.persona(id).await
    }

    async fn insert_lyrics(&self, _new: NewLyrics) -> lyricgen_common::Result<LyricsRecord> {
        Err(lyricgen_common::Error::Internal("database is locked".to_string()))
    }
}

/// Single-connection in-memory database with the full schema
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    lyricgen_api::db::init_tables(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

/// Zero-delay app state over the given token source
pub fn test_state(pool: SqlitePool, token_source: Arc<dyn TokenSource>) -> AppState {
    AppState::new(
        pool,
        token_source,
        SegmenterConfig::default(),
        PacingPolicy::immediate(),
        256,
    )
}

pub async fn test_app(steps: Vec<Step>) -> (axum::Router, SqlitePool) {
    let pool = test_pool().await;
    let state = test_state(pool.clone(), Arc::new(ScriptedTokenSource::new(steps)));
    (lyricgen_api::build_router(state), pool)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Send and decode a JSON response
pub async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Read an SSE body to the end and decode every event
pub async fn read_events(response: Response<Body>) -> Vec<LiveEvent> {
    let mut decoder = SseFrameDecoder::new();
    let mut events = Vec::new();
    let mut body = response.into_body().into_data_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.unwrap();
        for data in decoder.push(&chunk) {
            events.push(serde_json::from_str(&data).unwrap());
        }
    }

    assert_eq!(decoder.pending_len(), 0, "SSE body ended mid-frame");
    events
}

pub fn content_text(events: &[LiveEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            LiveEvent::Content { chunk } => Some(chunk.as_str()),
            _ => None,
        })
        .collect()
}

pub fn generate_body(theme: &str) -> Value {
    serde_json::json!({
        "theme": theme,
        "emotion_params": {
            "bright": 20, "sad": 70, "sadness": 0, "dark": 0, "despair": 0,
            "hope": 60, "nostalgic": 0, "grand": 0, "fantasy": 0, "passionate": 0
        }
    })
}

pub async fn lyrics_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM lyrics")
        .fetch_one(pool)
        .await
        .unwrap()
}
