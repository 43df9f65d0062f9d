//! LLM backend abstraction and implementations.
//!
//! Enum dispatch over the supported providers, avoiding the
//! dyn-compatibility issues with async trait methods. Remote providers talk
//! HTTP via `reqwest`; [`ScriptedBackend`] replays canned responses for dry
//! runs and tests.
//!
//! Two entry points:
//!
//! - [`LlmBackend::complete`] returns the raw provider text or an error.
//! - [`LlmBackend::generate`] never fails: on any error it returns the
//!   standardized fallback JSON asking for human help, so the decision
//!   agent sees the failure as an ordinary response.

use std::collections::VecDeque;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{LlmBackendConfig, Provider};
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

const MAX_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
pub enum LlmBackend {
    /// `OpenAI` chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// Google Gemini `generateContent`.
    Gemini(GeminiBackend),
    /// Local Ollama.
    Ollama(OllamaBackend),
    /// Offline canned responses.
    Scripted(ScriptedBackend),
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LlmBackend").field(&self.name()).finish()
    }
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
            Self::Gemini(backend) => backend.complete(prompt).await,
            Self::Ollama(backend) => backend.complete(prompt).await,
            Self::Scripted(backend) => backend.complete().await,
        }
    }

    /// Like [`complete`](Self::complete), but failures become the
    /// fallback response instead of an error.
    pub async fn generate(&self, prompt: &RenderedPrompt) -> String {
        match self.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(backend = self.name(), error = %e, "LLM call failed, using fallback response");
                fallback_response(self.provider().label(), &self.failure_details(&e))
            }
        }
    }

    /// Provider key for logging.
    pub const fn name(&self) -> &'static str {
        self.provider().key()
    }

    /// Which provider this backend talks to.
    pub const fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::OpenAi,
            Self::Anthropic(_) => Provider::Anthropic,
            Self::Gemini(_) => Provider::Gemini,
            Self::Ollama(_) => Provider::Ollama,
            Self::Scripted(_) => Provider::Scripted,
        }
    }

    fn failure_details(&self, error: &RunnerError) -> String {
        match self {
            Self::Ollama(backend) => format!(
                "Local instance failed. Is it running and is the model '{}' pulled?",
                backend.model
            ),
            _ => error.to_string(),
        }
    }
}

/// The standardized response used when a backend call fails.
///
/// Asks for human help so a persistent outage pauses the run instead of
/// silently idling. Double quotes in `details` become single quotes.
pub fn fallback_response(provider: &str, details: &str) -> String {
    let details = details.replace('"', "'");
    serde_json::json!({
        "thought": format!(
            "The API call to {provider} failed with an error: {details}. This could be due to an invalid API key, network issues, or a problem with the API itself. I should ask a human for help if this continues."
        ),
        "action": {"tool": "ask_for_human_help", "parameters": {}},
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

fn http_client(config: &LlmBackendConfig) -> Result<reqwest::Client, RunnerError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| RunnerError::Config(format!("failed to build HTTP client: {e}")))
}

/// POST `body` and return the parsed JSON response.
async fn post_json(
    label: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, RunnerError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{label} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_e| "unable to read error body".to_owned());
        return Err(RunnerError::LlmBackend(format!(
            "{label} returned {status}: {error_body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{label} response parse failed: {e}")))
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

/// Backend for `OpenAI`-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI` backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, RunnerError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "max_tokens": MAX_TOKENS,
        });
        if prompt.expects_json
            && let Some(map) = body.as_object_mut()
        {
            map.insert(
                "response_format".to_owned(),
                serde_json::json!({"type": "json_object"}),
            );
        }

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = post_json("OpenAI", request, &body).await?;
        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Uses the `x-api-key` header, a top-level `system` field, and returns
/// `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, RunnerError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/messages", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = post_json("Anthropic", request, &body).await?;
        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Backend for Google Gemini.
///
/// Sends requests to `{api_url}/models/{model}:generateContent?key=...`.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, RunnerError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let mut body = serde_json::json!({
            "system_instruction": {"parts": [{"text": prompt.system}]},
            "contents": [{"parts": [{"text": prompt.user}]}],
        });
        if prompt.expects_json
            && let Some(map) = body.as_object_mut()
        {
            map.insert(
                "generationConfig".to_owned(),
                serde_json::json!({"responseMimeType": "application/json"}),
            );
        }

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())]);
        let json = post_json("Gemini", request, &body).await?;
        extract_gemini_content(&json)
    }
}

/// Extract the text content from a Gemini `generateContent` response.
fn extract_gemini_content(json: &Value) -> Result<String, RunnerError> {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend(
                "Gemini response missing candidates[0].content.parts[0].text".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

/// Backend for a local Ollama instance (`{api_url}/api/generate`).
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, RunnerError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/api/generate", self.api_url);
        let mut body = serde_json::json!({
            "model": self.model,
            "system": prompt.system,
            "prompt": prompt.user,
            "stream": false,
        });
        if prompt.expects_json
            && let Some(map) = body.as_object_mut()
        {
            map.insert("format".to_owned(), Value::from("json"));
        }

        let json = post_json("Ollama", self.client.post(&url), &body).await?;
        json.get("response")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| RunnerError::LlmBackend("Ollama response missing 'response'".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Scripted
// ---------------------------------------------------------------------------

/// Offline backend replaying canned responses in order.
///
/// An exhausted queue is a backend error, which [`LlmBackend::generate`]
/// turns into the fallback response.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    /// Create a backend that will answer with `responses`, in order.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue another response.
    pub async fn push(&self, response: impl Into<String>) {
        self.responses.lock().await.push_back(response.into());
    }

    /// Number of responses not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }

    async fn complete(&self) -> Result<String, RunnerError> {
        let next = self.responses.lock().await.pop_front();
        debug!(found = next.is_some(), "Scripted response requested");
        next.ok_or_else(|| RunnerError::LlmBackend("scripted backend has no responses left".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> Result<LlmBackend, RunnerError> {
    config.validate()?;
    Ok(match config.provider {
        Provider::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)?),
        Provider::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)?),
        Provider::Gemini => LlmBackend::Gemini(GeminiBackend::new(config)?),
        Provider::Ollama => LlmBackend::Ollama(OllamaBackend::new(config)?),
        Provider::Scripted => LlmBackend::Scripted(ScriptedBackend::new(
            config.scripted_responses.iter().cloned(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "sys".to_owned(),
            user: "user".to_owned(),
            expects_json: true,
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"thought\": \"t\"}"}}]
        });
        assert!(extract_openai_content(&json).unwrap_or_default().contains("thought"));
        assert!(extract_openai_content(&serde_json::json!({"error": "rate_limit"})).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(extract_anthropic_content(&json).unwrap_or_default(), "hello");
        assert!(extract_anthropic_content(&serde_json::json!({"content": []})).is_err());
    }

    #[test]
    fn extract_gemini_content_valid() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{}"}]}}]
        });
        assert_eq!(extract_gemini_content(&json).unwrap_or_default(), "{}");
        assert!(extract_gemini_content(&serde_json::json!({"candidates": []})).is_err());
    }

    #[test]
    fn fallback_is_valid_json_requesting_help() {
        let raw = fallback_response("OpenAI", "bad \"key\"");
        let parsed: Value = serde_json::from_str(&raw).unwrap_or_default();
        assert_eq!(
            parsed.pointer("/action/tool").and_then(Value::as_str),
            Some("ask_for_human_help")
        );
        let thought = parsed.get("thought").and_then(Value::as_str).unwrap_or("");
        assert!(thought.starts_with("The API call to OpenAI failed with an error: bad 'key'."));
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let mut config = LlmBackendConfig::for_provider(Provider::Anthropic);
        config.api_key = "test".to_owned();
        assert_eq!(create_backend(&config).map(|b| b.name()).ok(), Some("anthropic"));

        let ollama = LlmBackendConfig::for_provider(Provider::Ollama);
        assert_eq!(create_backend(&ollama).map(|b| b.name()).ok(), Some("ollama"));

        assert!(create_backend(&LlmBackendConfig::for_provider(Provider::OpenAi)).is_err());
    }

    #[tokio::test]
    async fn scripted_replays_then_falls_back() {
        let backend = LlmBackend::Scripted(ScriptedBackend::new(["first", "second"]));
        assert_eq!(backend.generate(&prompt()).await, "first");
        assert_eq!(backend.complete(&prompt()).await.ok().as_deref(), Some("second"));
        assert!(backend.complete(&prompt()).await.is_err());
        assert!(backend.generate(&prompt()).await.contains("ask_for_human_help"));
    }

    #[tokio::test]
    async fn scripted_accepts_pushes() {
        let scripted = ScriptedBackend::default();
        scripted.push("later").await;
        assert_eq!(scripted.remaining().await, 1);
        assert_eq!(scripted.complete().await.ok().as_deref(), Some("later"));
    }
}
