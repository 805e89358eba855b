//! LLM client: the single point of entry for all generative-model calls in SkillMatch.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! Pipeline code depends on the `ModelInvoker` trait, never on `GeminiClient`.
//!
//! Model: gemini-2.5-flash (hardcoded)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::schema::ResultSchema;

#[cfg(test)]
pub mod stub;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all LLM calls in SkillMatch.
pub const MODEL: &str = "gemini-2.5-flash";
/// Upper bound on attempts per call, whatever the configuration asks for.
pub const MAX_ATTEMPTS_CAP: u32 = 5;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Transport failures, 429 and 5xx are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Builds an `Api` error, preferring `error.message` from a JSON error body.
    fn from_error_body(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<GeminiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        LlmError::Api { status, message }
    }
}

/// How the model is asked to shape its reply.
#[derive(Debug, Clone, Copy)]
pub enum ResponseMode {
    /// JSON output constrained by a declared result schema.
    Structured(&'static ResultSchema),
    /// Free-form text with live web-search grounding. The prompt carries the format directive.
    Grounded,
}

#[derive(Debug, Clone, Copy)]
pub struct InvocationConfig {
    pub mode: ResponseMode,
    pub temperature: f32,
}

/// A retrieval citation attached to a grounded response. Both fields may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Citation {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// Unvalidated model output: reply text plus any grounding citations.
#[derive(Debug, Clone, Default)]
pub struct RawModelOutput {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// The hosted-model capability the analysis pipeline is written against.
///
/// Carried in `AppState` as `Arc<dyn ModelInvoker>`; tests substitute a stub.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        config: &InvocationConfig,
    ) -> Result<RawModelOutput, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (generateContent)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub grounding_metadata: Option<GroundingMetadata>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
pub struct WebChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    /// Web citations of the first candidate, in the order the API returned them.
    pub fn citations(&self) -> Vec<Citation> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .map(|chunk| Citation {
                        title: chunk.web.as_ref().and_then(|w| w.title.clone()),
                        uri: chunk.web.as_ref().and_then(|w| w.uri.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn build_request_body<'a>(
    prompt: &'a str,
    config: &InvocationConfig,
) -> GenerateContentRequest<'a> {
    let (generation_config, tools) = match config.mode {
        ResponseMode::Structured(schema) => (
            GenerationConfig {
                temperature: config.temperature,
                response_mime_type: Some("application/json"),
                response_schema: Some(schema.to_response_schema()),
            },
            Vec::new(),
        ),
        ResponseMode::Grounded => (
            GenerationConfig {
                temperature: config.temperature,
                response_mime_type: None,
                response_schema: None,
            },
            vec![Tool {
                google_search: GoogleSearch {},
            }],
        ),
    };

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config,
        tools,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Gemini `generateContent` endpoint.
///
/// `max_attempts` of 1 means exactly one outbound call. Higher values retry
/// transport errors, 429 and 5xx with exponential backoff, up to `MAX_ATTEMPTS_CAP`.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_attempts: u32,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout_secs: u64, max_attempts: u32) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CAP),
        })
    }

    /// Points the client at another server speaking the same API.
    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{MODEL}:generateContent", self.base_url)
    }

    /// Makes a raw call to the Gemini API, returning the full response object.
    ///
    /// When every attempt hit 429, the result is `RateLimited`.
    pub async fn call(
        &self,
        prompt: &str,
        config: &InvocationConfig,
    ) -> Result<GenerateContentResponse, LlmError> {
        let request_body = build_request_body(prompt, config);
        let url = self.endpoint();

        let mut attempt: u32 = 1;
        loop {
            match self.send_once(&url, &request_body).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_attempts && e.is_retryable() => {
                    // Exponential backoff: 1s, 2s, 4s, 8s
                    let delay = Duration::from_millis(1000u64 << (attempt - 1));
                    warn!(
                        "LLM call attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(LlmError::Api { status: 429, .. }) if attempt > 1 => {
                    return Err(LlmError::RateLimited {
                        retries: attempt - 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        request_body: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Err(LlmError::from_error_body(status.as_u16(), body));
        }

        let body = response.text().await?;
        let llm_response: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &llm_response.usage_metadata {
            debug!(
                "LLM call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl ModelInvoker for GeminiClient {
    async fn invoke(
        &self,
        prompt: &str,
        config: &InvocationConfig,
    ) -> Result<RawModelOutput, LlmError> {
        let response = self.call(prompt, config).await?;

        if let Some(reason) = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            debug!("LLM finish_reason={reason}");
        }

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        Ok(RawModelOutput {
            citations: response.citations(),
            text,
        })
    }
}
