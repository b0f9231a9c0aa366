//! Chat-completion HTTP client.
//!
//! Speaks the `POST {base_url}/chat/completions` protocol shared by `OpenAI`
//! and compatible providers, sending each prompt as a single user message.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{CompletionError, CompletionService, LlmErrorKind};

/// Connection and sampling settings for [`OpenAiClient`].
#[derive(Clone)]
pub struct ClientSettings {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token for the service.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

// The key never reaches logs.
impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// [`CompletionService`] backed by a hosted chat-completion endpoint.
///
/// # Example
///
/// ```no_run
/// use questgenie_llm::{ClientSettings, CompletionService, OpenAiClient};
///
/// # async fn example() -> Result<(), questgenie_llm::CompletionError> {
/// let client = OpenAiClient::new(ClientSettings {
///     base_url: "https://api.openai.com/v1".to_string(),
///     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
///     model: "gpt-4o-mini".to_string(),
///     temperature: 0.7,
///     max_tokens: 256,
/// });
/// let question = client.complete("Generate a Easy level question on Rust.").await?;
/// println!("{question}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    settings: ClientSettings,
}

impl OpenAiClient {
    /// Creates a client with a fresh connection pool.
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_http_client(settings, Client::new())
    }

    /// Creates a client that reuses an existing `reqwest` connection pool.
    #[must_use]
    pub const fn with_http_client(settings: ClientSettings, http: Client) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    #[instrument(skip(self, prompt), fields(model = %self.settings.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let started = Instant::now();
        let payload = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let kind = classify_status(status, &body);
            warn!(%status, %kind, "Completion request rejected");
            return Err(CompletionError::new(
                kind,
                format!("{status}: {}", error_detail(&body)),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            CompletionError::new(
                LlmErrorKind::Other,
                format!("malformed completion response: {e}"),
            )
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                CompletionError::new(LlmErrorKind::EmptyResponse, "no completion text returned")
            })?;

        debug!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            completion_len = text.len(),
            "Completion received"
        );
        Ok(text)
    }
}

/// Maps a non-success HTTP status to an error kind.
///
/// A 429 is a quota problem when the provider says so in the body, and a
/// plain rate limit otherwise.
pub fn classify_status(status: StatusCode, body: &str) -> LlmErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS if body.contains("insufficient_quota") => {
            LlmErrorKind::Quota
        }
        StatusCode::TOO_MANY_REQUESTS => LlmErrorKind::RateLimit,
        s if s.is_server_error() => LlmErrorKind::Server,
        _ => LlmErrorKind::Other,
    }
}

fn transport_error(err: reqwest::Error) -> CompletionError {
    let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
        LlmErrorKind::Network
    } else {
        LlmErrorKind::Other
    };
    CompletionError::new(kind, err.to_string())
}

/// Pulls `error.message` out of a provider error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}
