//! Text generation providers
//!
//! Every provider implements [`TextGenerator`]. The concrete variant is
//! chosen once at startup from [`ProviderConfig`] and wrapped in the closed
//! [`Provider`] enum; nothing downstream branches on the provider name.

pub mod huggingface;
pub mod offline;
pub mod openai_compat;

pub use huggingface::HuggingFaceClient;
pub use offline::OfflineGenerator;
pub use openai_compat::OpenAiCompatibleClient;

use crate::config::ProviderConfig;
use crate::error::{Result, TaskPilotError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Upstream generation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider rejected the credentials: {message}")]
    Auth { message: String },

    #[error("Provider rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Provider request failed: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Classify a non-success HTTP reply
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            401 | 403 => Self::Auth { message },
            429 => Self::RateLimited { message },
            _ => Self::Http { status, message },
        }
    }
}

/// Pull a readable message out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let extracted = parsed.as_ref().and_then(|v| {
        v["error"]["message"]
            .as_str()
            .or_else(|| v["error"].as_str())
            .map(str::to_string)
    });
    extracted.unwrap_or_else(|| taskpilot_common::truncate_string(body.trim(), 200))
}

/// Contract consumed by the generation pipeline
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt` under the given system instructions
    async fn generate(
        &self,
        prompt: &str,
        system_instructions: &str,
    ) -> std::result::Result<String, ProviderError>;

    /// Short provider name for logs and diagnostics
    fn name(&self) -> &'static str;
}

/// Which upstream service generates text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    Groq,
    HuggingFace,
    #[default]
    #[serde(alias = "mock")]
    Offline,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::HuggingFace => "huggingface",
            Self::Offline => "offline",
        }
    }

    /// Whether this kind calls a remote API and therefore needs a key
    #[must_use]
    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Offline)
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::HuggingFace => "https://api-inference.huggingface.co",
            Self::Offline => "",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenRouter => "microsoft/wizardlm-2-8x22b",
            Self::Groq => "llama3-8b-8192",
            Self::HuggingFace => "microsoft/DialoGPT-large",
            Self::Offline => "offline",
        }
    }

    #[must_use]
    pub fn default_max_tokens(self) -> u32 {
        match self {
            Self::OpenRouter => 200,
            Self::Groq => 1500,
            Self::HuggingFace | Self::Offline => 0,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "groq" => Ok(Self::Groq),
            "huggingface" => Ok(Self::HuggingFace),
            "offline" | "mock" => Ok(Self::Offline),
            other => Err(format!("Unknown AI provider: {other}")),
        }
    }
}

/// The provider selected at startup
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAiCompatible(OpenAiCompatibleClient),
    HuggingFace(HuggingFaceClient),
    Offline(OfflineGenerator),
}

impl Provider {
    /// Resolve the configured provider
    ///
    /// A remote kind without an API key resolves to the offline generator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = match (&config.api_key, config.kind.is_remote()) {
            (_, false) => return Ok(Self::Offline(OfflineGenerator)),
            (Some(key), true) if !key.trim().is_empty() => key.clone(),
            (_, true) => {
                warn!(
                    provider = config.kind.as_str(),
                    "No API key configured; using the offline generator"
                );
                return Ok(Self::Offline(OfflineGenerator));
            }
        };

        let client = build_client(Duration::from_secs(config.timeout_secs))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.kind.default_base_url().to_string());
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| config.kind.default_model().to_string());

        let provider = match config.kind {
            ProviderKind::OpenRouter | ProviderKind::Groq => {
                let max_tokens = config
                    .max_tokens
                    .unwrap_or_else(|| config.kind.default_max_tokens());
                let mut chat = OpenAiCompatibleClient::new(
                    client,
                    config.kind,
                    base_url,
                    api_key,
                    model,
                    config.temperature,
                    max_tokens,
                );
                if config.kind == ProviderKind::OpenRouter {
                    chat = chat.with_header("X-Title", taskpilot_common::APP_NAME);
                }
                Self::OpenAiCompatible(chat)
            }
            ProviderKind::HuggingFace => {
                Self::HuggingFace(HuggingFaceClient::new(client, base_url, api_key, model))
            }
            ProviderKind::Offline => Self::Offline(OfflineGenerator),
        };

        debug!(provider = provider.name(), "Text generation provider ready");
        Ok(provider)
    }

    /// Kind of the resolved provider
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAiCompatible(client) => client.kind(),
            Self::HuggingFace(_) => ProviderKind::HuggingFace,
            Self::Offline(_) => ProviderKind::Offline,
        }
    }
}

#[async_trait]
impl TextGenerator for Provider {
    async fn generate(
        &self,
        prompt: &str,
        system_instructions: &str,
    ) -> std::result::Result<String, ProviderError> {
        #[cfg(feature = "observability")]
        metrics::counter!("taskpilot_provider_requests_total", "provider" => self.name())
            .increment(1);

        let result = match self {
            Self::OpenAiCompatible(client) => client.generate(prompt, system_instructions).await,
            Self::HuggingFace(client) => client.generate(prompt, system_instructions).await,
            Self::Offline(generator) => generator.generate(prompt, system_instructions).await,
        };

        if let Err(e) = &result {
            error!(provider = self.name(), error = %e, "Text generation failed");
        }
        result
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible(client) => client.name(),
            Self::HuggingFace(client) => client.name(),
            Self::Offline(generator) => generator.name(),
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TaskPilotError::configuration(format!("Failed to build HTTP client: {e}")))
}
