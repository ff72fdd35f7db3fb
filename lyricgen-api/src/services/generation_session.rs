//! One generation request, end to end
//!
//! A live session owns its segmenter, transcript and token stream. Fragments
//! feed the segmenter (whose spans are paced out as `content` events) and
//! the transcript; when the stream ends the transcript is extracted,
//! normalized and stored, and the stored record is sent as `complete`.
//!
//! Terminal behavior:
//! - upstream failure sends `error` and stores nothing
//! - no recoverable payload closes the feed without a terminal event
//! - a store failure is logged and closes the feed without a terminal event
//! - a dropped consumer stops the session and drops the upstream stream

use futures::StreamExt;
use lyricgen_common::models::{GenerateLyricsRequest, LyricsRecord, NewLyrics};
use lyricgen_common::LiveEvent;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::generation_store::GenerationStore;
use super::pacing::{PacingEmitter, PacingPolicy};
use super::payload_extractor::{extract_payload, RawTranscript};
use super::schema_normalizer::{normalize_payload, StructuredResult};
use super::segmenter::{Segmenter, SegmenterConfig};
use super::token_source::{LlmError, TokenSource};

/// Message carried by the `error` event on upstream failure
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed";

/// Collaborators shared by every session
#[derive(Clone)]
pub struct GenerationContext {
    pub store: Arc<dyn GenerationStore>,
    pub token_source: Arc<dyn TokenSource>,
    pub segmenter: SegmenterConfig,
    pub pacing: PacingPolicy,
}

/// How a live session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(Box<LyricsRecord>),
    NoPayload,
    PersistFailed,
    UpstreamFailed,
    Disconnected,
}

impl SessionOutcome {
    fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed(_) => "completed",
            SessionOutcome::NoPayload => "no_payload",
            SessionOutcome::PersistFailed => "persist_failed",
            SessionOutcome::UpstreamFailed => "upstream_failed",
            SessionOutcome::Disconnected => "disconnected",
        }
    }
}

/// Non-streaming generation failures
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Upstream(#[from] LlmError),

    #[error("No content generated")]
    EmptyOutput,

    #[error("Invalid content schema")]
    InvalidSchema,

    #[error("Failed to store lyrics: {0}")]
    Persist(#[from] lyricgen_common::Error),
}

/// Drive one live session until its feed is finished
pub async fn run_live_session(
    ctx: GenerationContext,
    request: GenerateLyricsRequest,
    prompt: String,
    tx: mpsc::Sender<LiveEvent>,
) -> SessionOutcome {
    let session_id = Uuid::new_v4();
    info!(
        session_id = %session_id,
        model = ctx.token_source.model(),
        theme = %request.theme,
        "Live generation session started"
    );

    let outcome = stream_session(&ctx, &request, prompt, &tx, session_id).await;

    info!(session_id = %session_id, outcome = outcome.label(), "Live generation session finished");
    outcome
}

async fn stream_session(
    ctx: &GenerationContext,
    request: &GenerateLyricsRequest,
    prompt: String,
    tx: &mpsc::Sender<LiveEvent>,
    session_id: Uuid,
) -> SessionOutcome {
    let mut tokens = ctx.token_source.stream_completion(prompt);
    let mut segmenter = Segmenter::new(ctx.segmenter.clone());
    let mut transcript = RawTranscript::new();
    let emitter = PacingEmitter::new(&ctx.pacing, tx);
    let mut emitted_chars = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                info!(session_id = %session_id, "Consumer disconnected while awaiting upstream");
                return SessionOutcome::Disconnected;
            }
            next = tokens.next() => next,
        };

        match next {
            Some(Ok(fragment)) => {
                transcript.append(&fragment);
                if let Some(span) = segmenter.push(&fragment) {
                    match emitter.emit(&span).await {
                        Ok(sent) => emitted_chars += sent,
                        Err(_) => {
                            info!(session_id = %session_id, "Consumer disconnected during emission");
                            return SessionOutcome::Disconnected;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                error!(session_id = %session_id, error = %e, "Upstream generation failed");
                let _ = tx
                    .send(LiveEvent::Error {
                        error: GENERATION_FAILED_MESSAGE.to_string(),
                    })
                    .await;
                return SessionOutcome::UpstreamFailed;
            }
            None => break,
        }
    }
    drop(tokens);

    debug!(
        session_id = %session_id,
        emitted_chars,
        transcript_chars = transcript.char_count(),
        phase = ?segmenter.phase(),
        "Upstream stream ended"
    );

    let Some(result) = recover_result(&transcript.into_text(), session_id) else {
        return SessionOutcome::NoPayload;
    };

    let record = match ctx.store.insert_lyrics(new_lyrics(request, result)).await {
        Ok(record) => record,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to store generated lyrics");
            return SessionOutcome::PersistFailed;
        }
    };

    info!(session_id = %session_id, lyrics_id = %record.id, "Generated lyrics stored");

    if tx
        .send(LiveEvent::Complete {
            data: record.clone(),
        })
        .await
        .is_err()
    {
        warn!(session_id = %session_id, "Consumer gone before completion event");
    }

    SessionOutcome::Completed(Box::new(record))
}

/// Collect a whole completion, then extract, normalize and store it
pub async fn run_collected_session(
    ctx: &GenerationContext,
    request: &GenerateLyricsRequest,
    prompt: String,
) -> Result<LyricsRecord, GenerationError> {
    let session_id = Uuid::new_v4();
    info!(
        session_id = %session_id,
        model = ctx.token_source.model(),
        theme = %request.theme,
        "Collected generation started"
    );

    let mut tokens = ctx.token_source.stream_completion(prompt);
    let mut transcript = RawTranscript::new();
    while let Some(fragment) = tokens.next().await {
        transcript.append(&fragment?);
    }
    drop(tokens);

    let text = transcript.into_text();
    if text.trim().is_empty() {
        warn!(session_id = %session_id, "Model returned no content");
        return Err(GenerationError::EmptyOutput);
    }

    let result = recover_result(&text, session_id).ok_or(GenerationError::InvalidSchema)?;
    let record = ctx.store.insert_lyrics(new_lyrics(request, result)).await?;

    info!(session_id = %session_id, lyrics_id = %record.id, "Generated lyrics stored");
    Ok(record)
}

fn recover_result(text: &str, session_id: Uuid) -> Option<StructuredResult> {
    let Some(payload) = extract_payload(text) else {
        warn!(session_id = %session_id, "No structured payload found in transcript");
        return None;
    };

    let result = normalize_payload(&payload);
    if result.is_none() {
        warn!(session_id = %session_id, "Structured payload has unusable lyrics or titles");
    }
    result
}

fn new_lyrics(request: &GenerateLyricsRequest, result: StructuredResult) -> NewLyrics {
    NewLyrics {
        theme: request.theme.clone(),
        emotion_params: request.emotion_params,
        generated_lyrics: result.lyrics,
        generated_titles: result.titles,
        persona_id: request.persona_id,
    }
}
