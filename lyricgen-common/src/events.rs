//! Live feed event types
//!
//! One generation session produces any number of `content` events followed
//! by at most one terminal `complete` or `error` event.

use serde::{Deserialize, Serialize};

use crate::models::LyricsRecord;

/// Event delivered to a live feed consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveEvent {
    /// One character of the human-readable lyric body
    Content { chunk: String },

    /// The stored record built from the trailing structured payload
    Complete { data: LyricsRecord },

    /// Upstream generation failed; nothing was stored
    Error { error: String },
}

impl LiveEvent {
    pub fn content(ch: char) -> Self {
        LiveEvent::Content {
            chunk: ch.to_string(),
        }
    }

    /// Event type string as it appears on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            LiveEvent::Content { .. } => "content",
            LiveEvent::Complete { .. } => "complete",
            LiveEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LiveEvent::Content { .. })
    }
}
