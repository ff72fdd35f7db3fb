//! Lyric generation endpoints
//!
//! POST /api/lyrics/stream opens a live feed of `content` events followed by
//! `complete` or `error`. POST /api/lyrics waits for the whole completion
//! and returns the stored record.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use lyricgen_common::models::{GenerateLyricsRequest, LyricsRecord};
use lyricgen_common::LiveEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use super::{json_body, success, ApiResponse};
use crate::services::{
    build_prompt, run_collected_session, run_live_session, PromptMode,
};
use crate::{ApiResult, AppState};

/// POST /api/lyrics/stream
pub async fn generate_lyrics_stream(
    State(state): State<AppState>,
    body: Result<Json<GenerateLyricsRequest>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let request = json_body(body)?;
    request.validate()?;
    state.token_source.ensure_ready()?;

    let prompt = build_prompt(
        state.store.as_ref(),
        PromptMode::Streaming,
        &request.theme,
        &request.emotion_params,
        request.persona_id,
    )
    .await;

    let (tx, mut rx) = mpsc::channel::<LiveEvent>(state.channel_capacity);
    tokio::spawn(run_live_session(
        state.generation_context(),
        request,
        prompt,
        tx,
    ));

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => warn!("Failed to serialize {} event: {}", event.event_type(), e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// POST /api/lyrics
pub async fn generate_lyrics(
    State(state): State<AppState>,
    body: Result<Json<GenerateLyricsRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<LyricsRecord>>> {
    let request = json_body(body)?;
    request.validate()?;
    state.token_source.ensure_ready()?;

    let prompt = build_prompt(
        state.store.as_ref(),
        PromptMode::Collected,
        &request.theme,
        &request.emotion_params,
        request.persona_id,
    )
    .await;

    let record = run_collected_session(&state.generation_context(), &request, prompt).await?;
    Ok(success(record))
}
