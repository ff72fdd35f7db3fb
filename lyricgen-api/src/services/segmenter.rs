//! Marker-delimited lyric segmenter
//!
//! The model is asked to write the lyric body between a `LYRICS_START` line
//! and a `LYRICS_END` line, followed by one JSON object. Fragments arrive
//! with arbitrary boundaries, so a sentinel can be split across two of them.
//! The segmenter is a small state machine over a pending buffer that yields
//! only spans which can no longer turn out to be part of a marker.
//!
//! When the end sentinel is missing or malformed, the first `{` followed
//! (within a lookahead window) by a `"lyrics"` or `"titles"` field name is
//! treated as the end of the lyric body.

use std::mem;

/// Sentinel opening the human-readable lyric body
pub const START_SENTINEL: &str = "LYRICS_START";

/// Sentinel closing the human-readable lyric body
pub const END_SENTINEL: &str = "LYRICS_END";

/// Default characters after a `{` searched for a payload field name
pub const DEFAULT_JSON_LOOKAHEAD: usize = 300;

/// Default lower bound of the tail kept back while no boundary is known
pub const DEFAULT_MIN_TAIL_RESERVE: usize = 64;

const PAYLOAD_FIELD_MARKERS: [&str; 2] = ["\"lyrics\"", "\"titles\""];

/// Segmenter tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterConfig {
    pub start_sentinel: String,
    pub end_sentinel: String,
    /// Window (in characters, brace included) searched for a payload field name
    pub json_lookahead: usize,
    /// Minimum characters held back while no boundary has been found
    pub min_tail_reserve: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            start_sentinel: START_SENTINEL.to_string(),
            end_sentinel: END_SENTINEL.to_string(),
            json_lookahead: DEFAULT_JSON_LOOKAHEAD,
            min_tail_reserve: DEFAULT_MIN_TAIL_RESERVE,
        }
    }
}

impl SegmenterConfig {
    pub fn with_heuristics(json_lookahead: usize, min_tail_reserve: usize) -> Self {
        Self {
            json_lookahead,
            min_tail_reserve,
            ..Self::default()
        }
    }

    /// Characters that must stay unemitted while no boundary is known
    pub fn tail_reserve(&self) -> usize {
        self.end_sentinel.chars().count().max(self.min_tail_reserve)
    }
}

/// Segmenter phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmenterPhase {
    /// Discarding preamble until the start sentinel shows up
    #[default]
    AwaitingStart,
    /// Inside the lyric body
    Emitting,
    /// Boundary reached; everything further is ignored
    Done,
}

/// Segmenter state: phase plus unconsumed text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmenterState {
    phase: SegmenterPhase,
    pending: String,
    /// Still deciding whether a line break follows the start sentinel
    at_marker_line_end: bool,
}

impl SegmenterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SegmenterPhase {
        self.phase
    }

    /// Text received but not yet emitted or discarded
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Consume one fragment, returning the next state and an emittable span
    pub fn step(mut self, config: &SegmenterConfig, fragment: &str) -> (Self, Option<String>) {
        match self.phase {
            SegmenterPhase::Done => return (self, None),
            SegmenterPhase::AwaitingStart => {
                self.pending.push_str(fragment);
                match self.pending.find(&config.start_sentinel) {
                    Some(idx) => {
                        self.pending.drain(..idx + config.start_sentinel.len());
                        self.phase = SegmenterPhase::Emitting;
                        self.at_marker_line_end = true;
                    }
                    None => {
                        let keep = config.start_sentinel.chars().count().saturating_sub(1);
                        retain_last_chars(&mut self.pending, keep);
                        return (self, None);
                    }
                }
            }
            SegmenterPhase::Emitting => self.pending.push_str(fragment),
        }

        if self.at_marker_line_end && !self.consume_marker_line_break() {
            return (self, None);
        }

        // Text after the end sentinel never counts toward the payload heuristic
        let end_idx = self.pending.find(&config.end_sentinel);
        let body_len = end_idx.unwrap_or(self.pending.len());
        let json_idx = find_payload_start(&self.pending[..body_len], config.json_lookahead);
        let boundary = match (end_idx, json_idx) {
            (Some(end), Some(json)) => Some(end.min(json)),
            (end, json) => end.or(json),
        };

        if let Some(boundary) = boundary {
            self.pending.truncate(boundary);
            let span = mem::take(&mut self.pending);
            self.phase = SegmenterPhase::Done;
            return (self, non_empty(span));
        }

        let safe_len = safe_prefix_len(&self.pending, config.tail_reserve());
        if safe_len == 0 {
            return (self, None);
        }
        let span: String = self.pending.drain(..safe_len).collect();
        (self, Some(span))
    }

    /// Drop one line break directly after the start sentinel
    ///
    /// Returns false while the buffer is too short to tell.
    fn consume_marker_line_break(&mut self) -> bool {
        if self.pending.starts_with("\r\n") {
            self.pending.drain(..2);
        } else if self.pending.starts_with('\n') {
            self.pending.drain(..1);
        } else if self.pending.is_empty() || self.pending == "\r" {
            return false;
        }
        self.at_marker_line_end = false;
        true
    }
}

/// Owning wrapper used by a streaming session
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
    state: SegmenterState,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: SegmenterState::new(),
        }
    }

    /// Feed one fragment; returns text that is safe to show
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        let state = mem::take(&mut self.state);
        let (next, span) = state.step(&self.config, fragment);
        self.state = next;
        span
    }

    pub fn phase(&self) -> SegmenterPhase {
        self.state.phase()
    }

    pub fn is_done(&self) -> bool {
        self.state.phase() == SegmenterPhase::Done
    }
}

/// Byte index of the first `{` that looks like the start of the payload
fn find_payload_start(text: &str, lookahead: usize) -> Option<usize> {
    let brace = text.find('{')?;
    let tail = &text[brace..];
    let window_end = tail
        .char_indices()
        .nth(lookahead)
        .map(|(idx, _)| idx)
        .unwrap_or(tail.len());
    let window = &tail[..window_end];

    PAYLOAD_FIELD_MARKERS
        .iter()
        .any(|marker| window.contains(marker))
        .then_some(brace)
}

/// Byte length of the prefix that leaves `reserve` characters behind
fn safe_prefix_len(text: &str, reserve: usize) -> usize {
    let char_count = text.chars().count();
    if char_count <= reserve {
        return 0;
    }
    text.char_indices()
        .nth(char_count - reserve)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

fn retain_last_chars(text: &mut String, keep: usize) {
    let char_count = text.chars().count();
    if char_count <= keep {
        return;
    }
    let cut = text
        .char_indices()
        .nth(char_count - keep)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    text.drain(..cut);
}

fn non_empty(span: String) -> Option<String> {
    if span.is_empty() {
        None
    } else {
        Some(span)
    }
}
