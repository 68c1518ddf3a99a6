//! Hosted chat model client.
//!
//! [`ChatModel`] turns a fully rendered prompt into generated text.
//! [`GeminiClient`] implements it against the Generative Language REST API
//! (`models/{model}:generateContent`).

use std::time::Instant;

use async_trait::async_trait;
use bankchat_shared::{BankChatError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("BankChat/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Generates a completion for a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name, for logging.
    fn model(&self) -> &str;

    /// Send `prompt` as one user turn and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
}

/// Gemini `generateContent` client with a fixed model and temperature.
pub struct GeminiClient {
    client: Client,
    url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build the client.
    ///
    /// An empty API key is rejected here so that a missing key surfaces when
    /// the pipeline is constructed rather than on the first question.
    pub fn new(opts: GeminiOptions) -> Result<Self> {
        if opts.api_key.trim().is_empty() {
            return Err(BankChatError::config("Gemini API key is empty"));
        }
        if opts.model.trim().is_empty() {
            return Err(BankChatError::config("Gemini model name is empty"));
        }
        let base = Url::parse(&opts.base_url).map_err(|e| {
            BankChatError::config(format!("invalid Gemini base URL '{}': {e}", opts.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BankChatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!(
                "{}/models/{}:generateContent",
                base.as_str().trim_end_matches('/'),
                opts.model
            ),
            model: opts.model,
            temperature: opts.temperature,
            api_key: opts.api_key,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BankChatError::Network(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BankChatError::Network(format!("failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(BankChatError::Generation(format!(
                "Gemini API returned HTTP {status}: {detail}"
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            BankChatError::Generation(format!("failed to parse Gemini response: {e}"))
        })?;

        let text = extract_text(parsed)?;
        info!(
            latency_ms = start.elapsed().as_millis() as u64,
            answer_chars = text.len(),
            "generation complete"
        );
        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".into());
        return Err(BankChatError::Generation(format!(
            "Gemini returned no answer: {reason}"
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "empty response".into());
        return Err(BankChatError::Generation(format!(
            "Gemini returned no text: {reason}"
        )));
    }

    debug!(chars = text.len(), "extracted candidate text");
    Ok(text)
}
