//! Upstream text generation
//!
//! [`TokenSource`] is the seam between the reframing pipeline and the model
//! provider. [`OpenAiTokenSource`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint with `stream: true` and yields the
//! `choices[0].delta.content` fragments in arrival order.

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use lyricgen_common::config::OpenAiConfig;
use lyricgen_common::SseFrameDecoder;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("LyricGen/", env!("CARGO_PKG_VERSION"));

/// Marker payload closing an OpenAI event stream
const DONE_MARKER: &str = "[DONE]";

/// Token source errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("No data from model provider for {0} seconds")]
    Timeout(u64),

    #[error("Rate limited by model provider")]
    RateLimit,

    #[error("Provider error {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Ordered text fragments of one completion
pub type TokenStream = BoxStream<'static, Result<String, LlmError>>;

/// Source of streamed completion fragments
pub trait TokenSource: Send + Sync {
    /// Fail fast before a live feed is opened
    fn ensure_ready(&self) -> Result<(), LlmError> {
        Ok(())
    }

    fn stream_completion(&self, prompt: String) -> TokenStream;

    /// Model identifier reported by health checks
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// OpenAI-compatible streaming client
pub struct OpenAiTokenSource {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_completion_tokens: u32,
    idle_timeout: Duration,
}

impl OpenAiTokenSource {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            max_completion_tokens: config.max_completion_tokens,
            idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl TokenSource for OpenAiTokenSource {
    fn ensure_ready(&self) -> Result<(), LlmError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(LlmError::MissingApiKey),
        }
    }

    fn stream_completion(&self, prompt: String) -> TokenStream {
        let client = self.http_client.clone();
        let url = self.completions_url();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let idle_timeout = self.idle_timeout;
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_completion_tokens: self.max_completion_tokens,
            stream: true,
        };

        Box::pin(try_stream! {
            let api_key = api_key.ok_or(LlmError::MissingApiKey)?;

            tracing::info!(model = %model, "Opening completion stream");

            let response = tokio::time::timeout(
                idle_timeout,
                send_request(&client, &url, &api_key, &request),
            )
            .await
            .map_err(|_| LlmError::Timeout(idle_timeout.as_secs()))??;

            let mut decoder = SseFrameDecoder::new();
            let mut bytes = response.bytes_stream();
            let mut total_chars = 0usize;

            'frames: while let Some(chunk) = next_within(&mut bytes, idle_timeout).await? {
                let chunk = chunk.map_err(|e| LlmError::Network(e.to_string()))?;
                for data in decoder.push(&chunk) {
                    if data.trim() == DONE_MARKER {
                        break 'frames;
                    }
                    if let Some(content) = parse_delta(&data)? {
                        total_chars += content.chars().count();
                        yield content;
                    }
                }
            }

            tracing::info!(model = %model, chars = total_chars, "Completion stream finished");
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// POST the completion request, mapping non-success statuses to errors
async fn send_request(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    request: &ChatCompletionRequest,
) -> Result<reqwest::Response, LlmError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimit);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Next stream item, failing if nothing arrives within `idle`
async fn next_within<S>(stream: &mut S, idle: Duration) -> Result<Option<S::Item>, LlmError>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(idle, stream.next())
        .await
        .map_err(|_| LlmError::Timeout(idle.as_secs()))
}

/// Extract the text fragment carried by one stream event, if any
fn parse_delta(data: &str) -> Result<Option<String>, LlmError> {
    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).map_err(|e| LlmError::Parse(e.to_string()))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.map(str::to_string),
            base_url: "http://localhost:9/v1/".to_string(),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn test_parse_delta_content() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"夜"}}]}"#;
        assert_eq!(parse_delta(data).unwrap(), Some("夜".to_string()));
    }

    #[test]
    fn test_parse_delta_without_content() {
        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta(role_only).unwrap(), None);

        let empty = r#"{"choices":[{"index":0,"delta":{"content":""},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_delta(empty).unwrap(), None);

        assert_eq!(parse_delta(r#"{"choices":[]}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_delta_rejects_malformed_event() {
        assert!(matches!(parse_delta("not json"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_completions_url_joins_base() {
        let source = OpenAiTokenSource::new(&config(Some("sk-test"))).unwrap();
        assert_eq!(source.completions_url(), "http://localhost:9/v1/chat/completions");
        assert_eq!(source.model(), "gpt-5-mini");
    }

    #[test]
    fn test_missing_key_not_ready() {
        let source = OpenAiTokenSource::new(&config(None)).unwrap();
        assert!(matches!(source.ensure_ready(), Err(LlmError::MissingApiKey)));

        let blank = OpenAiTokenSource::new(&config(Some("  "))).unwrap();
        assert!(blank.ensure_ready().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_applies_per_chunk() {
        let idle = Duration::from_secs(5);

        // Steady chunks outlast the idle limit in total without tripping it
        let mut steady = Box::pin(futures::stream::iter(1..=4).then(|n| async move {
            tokio::time::sleep(Duration::from_secs(4)).await;
            n
        }));
        let mut received = Vec::new();
        while let Some(n) = next_within(&mut steady, idle).await.unwrap() {
            received.push(n);
        }
        assert_eq!(received, vec![1, 2, 3, 4]);

        let mut silent = futures::stream::pending::<u8>();
        assert!(matches!(
            next_within(&mut silent, idle).await,
            Err(LlmError::Timeout(5))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_stream_without_request() {
        let source = OpenAiTokenSource::new(&config(None)).unwrap();
        let mut stream = source.stream_completion("prompt".to_string());

        match stream.next().await {
            Some(Err(LlmError::MissingApiKey)) => {}
            other => panic!("Expected MissingApiKey, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(stream.next().await.is_none());
    }
}
