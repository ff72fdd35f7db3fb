//! Lyric generation services
//!
//! The reframing pipeline, leaf first:
//! - `segmenter`: marker-delimited lyric body detection over raw fragments
//! - `pacing`: character-by-character emission to the live feed
//! - `payload_extractor`: JSON recovery from the full transcript
//! - `schema_normalizer`: canonical lyrics/titles shape
//!
//! `generation_session` drives one request through all of them.

pub mod generation_session;
pub mod generation_store;
pub mod pacing;
pub mod payload_extractor;
pub mod prompt_builder;
pub mod schema_normalizer;
pub mod segmenter;
pub mod token_source;

pub use generation_session::{
    run_collected_session, run_live_session, GenerationContext, GenerationError, SessionOutcome,
};
pub use generation_store::{GenerationStore, SqliteGenerationStore};
pub use pacing::{PacingEmitter, PacingPolicy, Scheduler};
pub use payload_extractor::{extract_payload, RawTranscript};
pub use prompt_builder::{build_prompt, PromptMode};
pub use schema_normalizer::{normalize_payload, StructuredResult};
pub use segmenter::{Segmenter, SegmenterConfig, SegmenterPhase, SegmenterState};
pub use token_source::{LlmError, OpenAiTokenSource, TokenSource, TokenStream};
