//! Canonical result shape for recovered payloads
//!
//! Models answer with whatever keys they like (`歌詞`, `content`,
//! `title_candidates`, ...) and titles arrive as arrays or as a single
//! delimited string. Everything is folded into [`StructuredResult`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Most title candidates kept per result
pub const MAX_TITLES: usize = 5;

/// Title used when the lyrics offer no usable line either
pub const PLACEHOLDER_TITLE: &str = "Untitled";

const LYRICS_KEYS: [&str; 4] = ["lyrics", "歌詞", "content", "text"];
const TITLE_KEYS: [&str; 4] = ["titles", "タイトル", "title_candidates", "titles_json"];

/// Newlines, ASCII/ideographic/full-width commas, bullets, `1.` markers and a leading `- `
static TITLE_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)\r?\n|,|、|，|・|\x{2022}|\d+\.|^-\s+").expect("title separator pattern is valid")
});

/// Lyrics with 1..=MAX_TITLES title candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredResult {
    pub lyrics: String,
    pub titles: Vec<String>,
}

/// Fold a recovered payload into the canonical shape
///
/// Returns `None` when the lyrics cannot be coerced to a non-blank string or
/// when a titles field is present with an unusable type.
pub fn normalize_payload(payload: &Value) -> Option<StructuredResult> {
    let object = payload.as_object()?;

    let lyrics = coerce_lyrics(first_present(object, &LYRICS_KEYS)?)?;
    if lyrics.trim().is_empty() {
        return None;
    }

    let mut titles = match first_present(object, &TITLE_KEYS) {
        None => Vec::new(),
        Some(value) => coerce_titles(value)?,
    };
    titles.truncate(MAX_TITLES);

    if titles.is_empty() {
        titles.push(fallback_title(&lyrics));
    }

    Some(StructuredResult { lyrics, titles })
}

/// First alias whose value is present and non-null
fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn coerce_lyrics(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(lines) => Some(
            lines
                .iter()
                .map(|line| match line {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

fn coerce_titles(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(text) => Some(split_titles(text)),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Split a delimited title string into trimmed, non-empty candidates
pub fn split_titles(text: &str) -> Vec<String> {
    TITLE_SEPARATORS
        .split(text)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect()
}

fn fallback_title(lyrics: &str) -> String {
    lyrics
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(PLACEHOLDER_TITLE)
        .to_string()
}
