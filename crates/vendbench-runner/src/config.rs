//! Configuration for the language-model backend.
//!
//! The core crate builds an [`LlmBackendConfig`] from its YAML file (with
//! `LLM_*` environment overrides) and hands it to
//! [`create_backend`](crate::llm::create_backend).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RunnerError;

/// Default request timeout for remote providers.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// `OpenAI` chat completions API (and compatibles).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini `generateContent` API.
    Gemini,
    /// Local Ollama `/api/generate`.
    Ollama,
    /// Offline queue of canned responses.
    Scripted,
}

impl Provider {
    /// Lowercase key used in configuration.
    pub const fn key(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Scripted => "scripted",
        }
    }

    /// Display name used in agent-facing messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::Ollama => "Ollama",
            Self::Scripted => "Scripted",
        }
    }

    /// Base URL used when none is configured.
    pub const fn default_api_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Ollama => "http://localhost:11434",
            Self::Scripted => "",
        }
    }

    /// Model used when none is configured.
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4-turbo",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Gemini => "gemini-1.5-flash-latest",
            Self::Ollama => "llama3",
            Self::Scripted => "scripted",
        }
    }

    /// Whether requests need an API key.
    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic | Self::Gemini)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Provider {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "deepseek" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "scripted" | "offline" => Ok(Self::Scripted),
            other => Err(RunnerError::Config(format!("unknown LLM provider: {other}"))),
        }
    }
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// Which provider to talk to.
    pub provider: Provider,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication; unused by Ollama and Scripted.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Canned responses for the scripted provider, in order.
    pub scripted_responses: Vec<String>,
}

impl LlmBackendConfig {
    /// Configuration for `provider` with its default URL and model.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            api_url: provider.default_api_url().to_owned(),
            api_key: String::new(),
            model: provider.default_model().to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            scripted_responses: Vec::new(),
        }
    }

    /// Offline configuration replaying `responses` in order.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted_responses: responses.into_iter().map(Into::into).collect(),
            ..Self::for_provider(Provider::Scripted)
        }
    }

    /// Reject configurations that cannot possibly work.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.provider.requires_api_key() && self.api_key.trim().is_empty() {
            return Err(RunnerError::Config(format!(
                "API Key is not set for {}.",
                self.provider.label()
            )));
        }
        if self.provider != Provider::Scripted && self.api_url.trim().is_empty() {
            return Err(RunnerError::Config(format!(
                "API URL is not set for {}.",
                self.provider.label()
            )));
        }
        Ok(())
    }
}
