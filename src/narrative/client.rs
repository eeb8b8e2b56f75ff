use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;

use super::payload::text_delta;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-flash-lite-latest";

const SYSTEM_INSTRUCTION: &str = "You are 'Persona', a helpful Data Science AI Assistant for a Customer Churn application.

CORE GUIDELINES:
1. **Structure is Key**: Use **bolding** for important terms, *italics* for emphasis, and bullet points for lists. NEVER output a wall of text.
2. **Be Concise yet Helpful**: Keep answers digestible. Use short paragraphs.
3. **Context Aware**: If user says \"Hi\", be brief. If they ask for analysis, use a structured format (e.g., \"Here's what I found: [Bullet points]\").
4. **Tone**: conversational, professional, and encouraging.";

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed event stream: {0}")]
    Stream(String),
}

impl From<EventStreamError<reqwest::Error>> for NarrativeError {
    fn from(e: EventStreamError<reqwest::Error>) -> Self {
        match e {
            EventStreamError::Transport(e) => NarrativeError::Http(e),
            other => NarrativeError::Stream(other.to_string()),
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

/// Streaming client for the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct NarrativeClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    generation: GenerationConfig,
}

impl NarrativeClient {
    pub fn new(http: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            api_key: api_key.into(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "system_instruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.generation.temperature,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "maxOutputTokens": self.generation.max_output_tokens,
            },
        })
    }

    /// Start a single-turn generation and stream its text deltas.
    ///
    /// Dropping the returned stream aborts the upstream request.
    pub async fn stream_text(
        &self,
        prompt: &str,
    ) -> Result<BoxStream<'static, Result<String, NarrativeError>>, NarrativeError> {
        let resp = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(512);
            return Err(NarrativeError::Status { status, body });
        }

        tracing::debug!(model = %self.model, "LLM stream opened");

        let chunks = resp
            .bytes_stream()
            .eventsource()
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) => text_delta(&event.data).map(Ok),
                    Err(e) => Some(Err(NarrativeError::from(e))),
                })
            })
            .boxed();

        Ok(chunks)
    }
}
