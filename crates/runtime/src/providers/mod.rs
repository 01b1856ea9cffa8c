//! LLM provider adapters.
//!
//! Each provider implements [`Backend`] for its specific API. [`ProviderBackend`]
//! picks one at runtime from a [`Provider`] name.

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder};
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use crate::Error;
use crate::model::{Backend, ModelError, ModelRequest, ModelResponse};
use std::fmt;
use std::str::FromStr;

/// A supported model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    OpenAi,
    Claude,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::OpenAi, Provider::Claude];

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o",
            Self::Claude => "claude-3-5-sonnet-20240620",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
            Self::Claude => "Claude",
        })
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            _ => Err(Error::UnsupportedProvider(s.trim().to_string())),
        }
    }
}

/// A backend chosen at runtime.
pub enum ProviderBackend {
    Anthropic(AnthropicBackend),
    OpenAi(OpenAiBackend),
    Gemini(GeminiBackend),
}

impl ProviderBackend {
    /// Build the backend for `provider`, falling back to its default model.
    pub fn new(provider: Provider, api_key: impl Into<String>, model: Option<String>) -> Self {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());
        match provider {
            Provider::Claude => Self::Anthropic(AnthropicBackend::builder(api_key, model).build()),
            Provider::OpenAi => Self::OpenAi(OpenAiBackend::new(api_key, model)),
            Provider::Gemini => Self::Gemini(GeminiBackend::new(api_key, model)),
        }
    }
}

impl Backend for ProviderBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        match self {
            Self::Anthropic(backend) => backend.call(request).await,
            Self::OpenAi(backend) => backend.call(request).await,
            Self::Gemini(backend) => backend.call(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Anthropic(backend) => backend.name(),
            Self::OpenAi(backend) => backend.name(),
            Self::Gemini(backend) => backend.name(),
        }
    }
}
