//! Structured payload recovery from the full model transcript
//!
//! Models are told to end with one bare JSON object but regularly wrap it in
//! a code fence or surround it with prose (or with the lyric body itself).
//! Recovery tries, in order: the interior of the first fenced block, the
//! candidate text as-is, and the slice from the first `{` to the last `}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("fenced block pattern is valid")
});

/// Every fragment of one generation, in arrival order
#[derive(Debug, Default, Clone)]
pub struct RawTranscript {
    text: String,
}

impl RawTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Hand the finished transcript to extraction
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Recover the JSON payload embedded in `text`, if any
pub fn extract_payload(text: &str) -> Option<Value> {
    let candidate = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text);

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&candidate[start..=end]) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Brace-delimited slice is not valid JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_json() {
        let value = extract_payload(r#"{"lyrics":"a\nb","titles":["t1","t2"]}"#).unwrap();
        assert_eq!(value["titles"], json!(["t1", "t2"]));
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let text = "Here is your song!\n{\"lyrics\":\"a\\nb\",\"titles\":[\"t1\",\"t2\"]}\nEnjoy.";
        let value = extract_payload(text).unwrap();
        assert_eq!(value["lyrics"], "a\nb");
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Result:\n```JSON\n{\"lyrics\": \"a\", \"titles\": \"x\"}\n```\nThanks";
        let value = extract_payload(text).unwrap();
        assert_eq!(value["titles"], "x");
    }

    #[test]
    fn test_fenced_block_with_trailing_prose_inside() {
        let text = "```\nNote: {\"lyrics\": \"a\", \"titles\": []} as requested\n```";
        let value = extract_payload(text).unwrap();
        assert_eq!(value["lyrics"], "a");
    }

    #[test]
    fn test_streaming_transcript_with_lyric_body() {
        let text = "LYRICS_START\nline one\nline two\nLYRICS_END\n{\"lyrics\":\"line one\\nline two\",\"titles\":[\"A\",\"B\"]}";
        let value = extract_payload(text).unwrap();
        assert_eq!(value["titles"], json!(["A", "B"]));
    }

    #[test]
    fn test_garbage_is_not_found() {
        assert!(extract_payload("no structure here at all").is_none());
        assert!(extract_payload("} backwards {").is_none());
        assert!(extract_payload("{\"lyrics\": \"unterminated").is_none());
    }

    #[test]
    fn test_transcript_accumulates_in_order() {
        let mut transcript = RawTranscript::new();
        assert!(transcript.is_empty());

        transcript.append("LYRICS_ST");
        transcript.append("ART\n夜");

        assert_eq!(transcript.char_count(), 14);
        assert_eq!(transcript.into_text(), "LYRICS_START\n夜");
    }
}
