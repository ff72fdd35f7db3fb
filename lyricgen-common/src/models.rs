//! Domain models shared by the LyricGen services
//!
//! Wire names follow the stored column names (`generated_lyrics`,
//! `generated_titles`, ...) so records can be returned to clients unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Maximum characters for a base rule or persona instruction
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Maximum characters for a persona name
pub const MAX_PERSONA_NAME_CHARS: usize = 100;

/// Upper bound of every emotion weight
pub const MAX_EMOTION_WEIGHT: f64 = 100.0;

/// Emotion weighting, 0-100 per named dimension
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionParams {
    pub bright: f64,
    pub sad: f64,
    pub sadness: f64,
    pub dark: f64,
    pub despair: f64,
    pub hope: f64,
    pub nostalgic: f64,
    pub grand: f64,
    pub fantasy: f64,
    pub passionate: f64,
}

impl EmotionParams {
    /// Dimension names paired with their weights, in declaration order
    pub fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("bright", self.bright),
            ("sad", self.sad),
            ("sadness", self.sadness),
            ("dark", self.dark),
            ("despair", self.despair),
            ("hope", self.hope),
            ("nostalgic", self.nostalgic),
            ("grand", self.grand),
            ("fantasy", self.fantasy),
            ("passionate", self.passionate),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.entries() {
            if !(0.0..=MAX_EMOTION_WEIGHT).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "emotion_params.{} must be between 0 and 100 (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Inbound "generate lyrics" request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateLyricsRequest {
    pub theme: String,
    pub emotion_params: EmotionParams,
    #[serde(default)]
    pub persona_id: Option<Uuid>,
}

impl GenerateLyricsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.theme.trim().is_empty() {
            return Err(Error::InvalidInput("theme is required".to_string()));
        }
        self.emotion_params.validate()
    }
}

/// Usage status of a stored lyrics record
///
/// Serialized with the labels existing clients already store and filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LyricsStatus {
    #[default]
    #[serde(rename = "未使用")]
    Unused,
    #[serde(rename = "使用済み")]
    Used,
}

impl LyricsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LyricsStatus::Unused => "未使用",
            LyricsStatus::Used => "使用済み",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "未使用" => Ok(LyricsStatus::Unused),
            "使用済み" => Ok(LyricsStatus::Used),
            other => Err(Error::InvalidInput(format!("Unknown lyrics status: {}", other))),
        }
    }
}

/// Persisted generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsRecord {
    pub id: Uuid,
    pub theme: String,
    pub emotion_params: EmotionParams,
    pub generated_lyrics: String,
    pub generated_titles: Vec<String>,
    pub status: LyricsStatus,
    pub persona_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when storing a new generation result
#[derive(Debug, Clone, PartialEq)]
pub struct NewLyrics {
    pub theme: String,
    pub emotion_params: EmotionParams,
    pub generated_lyrics: String,
    pub generated_titles: Vec<String>,
    pub persona_id: Option<Uuid>,
}

/// History list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsSummary {
    pub id: Uuid,
    pub theme: String,
    pub status: LyricsStatus,
    pub created_at: DateTime<Utc>,
    pub generated_titles: Vec<String>,
}

/// PATCH /api/lyrics/:id body
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: LyricsStatus,
}

/// Named writing persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: Uuid,
    pub name: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// Persona create/update body
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaInput {
    pub name: String,
    pub prompt: String,
}

impl PersonaInput {
    pub fn validate(&self) -> Result<()> {
        validate_length("name", &self.name, MAX_PERSONA_NAME_CHARS)?;
        validate_length("prompt", &self.prompt, MAX_PROMPT_CHARS)
    }
}

/// Base writing rule (single row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub prompt: String,
    pub updated_at: DateTime<Utc>,
}

/// PUT /api/rule body
#[derive(Debug, Clone, Deserialize)]
pub struct RuleInput {
    pub prompt: String,
}

impl RuleInput {
    pub fn validate(&self) -> Result<()> {
        validate_length("prompt", &self.prompt, MAX_PROMPT_CHARS)
    }
}

fn validate_length(field: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    if value.chars().count() > max_chars {
        return Err(Error::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(())
}
