//! Prompt assembly from theme, emotion weights, base rule and persona

use lyricgen_common::models::{EmotionParams, Persona};
use uuid::Uuid;

use super::generation_store::GenerationStore;
use super::segmenter::{END_SENTINEL, START_SENTINEL};

/// Used when no rule row exists or the lookup fails
pub const DEFAULT_BASE_RULE: &str =
    "Follow the typical J-POP song structure (verse A → verse B → chorus).";

/// Emotion weights at or below this are not mentioned
const EMOTION_THRESHOLD: f64 = 50.0;

const NO_DIRECTION: &str = "No particular direction";

/// Which output contract the model is asked to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// One bare JSON object with lyrics and titles
    Collected,
    /// Marker-wrapped lyric body first, then one bare JSON object
    Streaming,
}

fn emotion_label(name: &str) -> &'static str {
    match name {
        "bright" => "Bright mood",
        "sad" => "Bittersweet mood",
        "sadness" => "Deeply sorrowful mood",
        "dark" => "Dark mood",
        "despair" => "Despairing mood",
        "hope" => "Hopeful mood",
        "nostalgic" => "Nostalgic mood",
        "grand" => "Grand, epic mood",
        "fantasy" => "Dreamlike, fantastical mood",
        "passionate" => "Passionate mood",
        _ => "Unnamed mood",
    }
}

/// Render the emotion direction line
pub fn describe_emotions(params: &EmotionParams) -> String {
    let parts: Vec<String> = params
        .entries()
        .into_iter()
        .filter(|(_, weight)| *weight > EMOTION_THRESHOLD)
        .map(|(name, weight)| format!("{} (intensity: {})", emotion_label(name), weight))
        .collect();

    if parts.is_empty() {
        NO_DIRECTION.to_string()
    } else {
        parts.join(", ")
    }
}

/// Build the full prompt text for one generation
pub fn render_prompt(
    mode: PromptMode,
    theme: &str,
    params: &EmotionParams,
    base_rule: &str,
    persona: Option<&Persona>,
) -> String {
    let mut prompt = String::from(
        "You are a skilled lyricist. Write song lyrics under the following conditions.\n\n",
    );

    prompt.push_str(&format!("[Base rule]\n{}\n\n", base_rule));
    if let Some(persona) = persona {
        prompt.push_str(&format!("[Persona]\n{}: {}\n\n", persona.name, persona.prompt));
    }
    prompt.push_str(&format!("[Theme]\n{}\n\n", theme));
    prompt.push_str(&format!("[Emotional direction]\n{}\n\n", describe_emotions(params)));

    match mode {
        PromptMode::Collected => prompt.push_str(
            "[Output format]\n\
             Reply with the following JSON only. Never add markdown, explanations or code fences:\n\
             {\n  \"lyrics\": \"lyric body (with line breaks)\",\n  \
             \"titles\": [\"title 1\", \"title 2\", \"title 3\", \"title 4\", \"title 5\"]\n}\n\n",
        ),
        PromptMode::Streaming => prompt.push_str(&format!(
            "[Output procedure (strict)]\n\
             1) First output only the lyric body, wrapped in markers. Output a line containing only \
             \"{start}\", start the lyrics on the next line, and finish with a line containing only \
             \"{end}\". Never use the marker strings inside the lyrics.\n\
             2) After the lyrics are complete, output exactly one pure JSON object on a new line. \
             No markdown, explanations or code fences:\n\
             {{\n  \"lyrics\": \"the lyric body output above, unchanged (with line breaks)\",\n  \
             \"titles\": [\"title 1\", \"title 2\", \"title 3\", \"title 4\", \"title 5\"]\n}}\n\n",
            start = START_SENTINEL,
            end = END_SENTINEL,
        )),
    }

    prompt.push_str(
        "[Instruction priority]\n\
         1. Persona (when set)\n\
         2. Base rule\n\
         3. Emotional direction\n\
         4. Theme\n\n\
         [Notes]\n\
         - Propose five appealing titles that fit the lyrics.\n\
         - The JSON must contain no extra characters, blank lines or backquotes.\n",
    );

    prompt
}

/// Look up rule and persona concurrently, then render
///
/// Lookup failures degrade to the default rule and to no persona.
pub async fn build_prompt(
    store: &dyn GenerationStore,
    mode: PromptMode,
    theme: &str,
    params: &EmotionParams,
    persona_id: Option<Uuid>,
) -> String {
    let persona_lookup = async {
        match persona_id {
            Some(id) => match store.persona(id).await {
                Ok(Some(persona)) => Some(persona),
                Ok(None) => {
                    tracing::warn!(persona_id = %id, "Persona not found, generating without it");
                    None
                }
                Err(e) => {
                    tracing::warn!(persona_id = %id, error = %e, "Failed to fetch persona");
                    None
                }
            },
            None => None,
        }
    };

    let (rule, persona) = tokio::join!(store.base_rule(), persona_lookup);

    let base_rule = match rule {
        Ok(Some(prompt)) => prompt,
        Ok(None) => DEFAULT_BASE_RULE.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch base rule, using default");
            DEFAULT_BASE_RULE.to_string()
        }
    };

    render_prompt(mode, theme, params, &base_rule, persona.as_ref())
}
