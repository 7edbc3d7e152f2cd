//! Pluggable text-generation backend abstraction
//!
//! The coach only ever needs one operation from a model: turn a prompt into
//! raw text. Everything else (prompt construction, JSON extraction, shape
//! validation) happens on our side so that every backend behaves the same.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all backends
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `OllamaBackend`,
//!   `OpenAICompatibleBackend`, `MockBackend`
//! - `parsing`: best-effort JSON extraction and strict shape checks
//! - `coach`: the three coaching calls built on top of a client
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(client) = ai {
//!     let coach = FinancialCoach::new(client);
//!     let questions = coach.reflection_questions(&planned).await?;
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables (see `config` for the file equivalents):
//! - `AI_BACKEND`: gemini (default), ollama, openai_compatible, mock
//! - `GEMINI_API_KEY`, `GEMINI_MODEL` (default: gemini-2.5-flash)
//! - `OLLAMA_HOST`, `OLLAMA_MODEL` (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`, `OPENAI_COMPATIBLE_MODEL`, `OPENAI_COMPATIBLE_API_KEY`

pub mod coach;
mod gemini;
mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use coach::FinancialCoach;
pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::config::{AiConfig, Config};
use crate::error::Result;

/// Trait defining the interface for all text-generation backends
///
/// One request, one response: no streaming, no retries. Backends should be
/// Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Send a prompt and return the raw model output
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Generative Language API
    Gemini(GeminiBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from resolved configuration
    ///
    /// Returns None when the selected backend is missing a required value
    /// (API key for gemini, host for ollama/openai_compatible).
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let backend = config.backend_name();

        match backend.as_str() {
            "gemini" => {
                let api_key = config.api_key.as_deref()?;
                let model = config
                    .model
                    .as_deref()
                    .unwrap_or(gemini::DEFAULT_GEMINI_MODEL);
                let mut b = GeminiBackend::new(api_key, model);
                if let Some(host) = config.host.as_deref() {
                    b = b.with_host(host);
                }
                Some(AIClient::Gemini(b))
            }
            "ollama" => {
                let host = config.host.as_deref()?;
                let model = config
                    .model
                    .as_deref()
                    .unwrap_or(ollama::DEFAULT_OLLAMA_MODEL);
                Some(AIClient::Ollama(OllamaBackend::new(host, model)))
            }
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                let host = config.host.as_deref()?;
                let model = config
                    .model
                    .as_deref()
                    .unwrap_or(openai_compatible::DEFAULT_OPENAI_MODEL);
                let b = match config.api_key.as_deref() {
                    Some(key) => OpenAICompatibleBackend::with_api_key(host, model, key),
                    None => OpenAICompatibleBackend::new(host, model),
                };
                Some(AIClient::OpenAICompatible(b))
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI backend, AI features disabled");
                None
            }
        }
    }

    /// Create an AI client from environment variables only
    pub fn from_env() -> Option<Self> {
        let mut config = Config::default();
        config.apply_env();
        Self::from_config(&config.ai)
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Short backend name for display
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Gemini(_) => "gemini",
            AIClient::Ollama(_) => "ollama",
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Mock(_) => "mock",
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Gemini(b) => AIClient::Gemini(b.with_model(model)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.generate(prompt).await,
            AIClient::Ollama(b) => b.generate(prompt).await,
            AIClient::OpenAICompatible(b) => b.generate(prompt).await,
            AIClient::Mock(b) => b.generate(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.backend_name(), "mock");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let gemini_without_key = AiConfig {
            backend: Some("gemini".into()),
            ..Default::default()
        };
        assert!(AIClient::from_config(&gemini_without_key).is_none());

        let ollama_without_host = AiConfig {
            backend: Some("ollama".into()),
            ..Default::default()
        };
        assert!(AIClient::from_config(&ollama_without_host).is_none());

        let unknown = AiConfig {
            backend: Some("carrier-pigeon".into()),
            ..Default::default()
        };
        assert!(AIClient::from_config(&unknown).is_none());
    }

    #[test]
    fn test_from_config_selects_backend() {
        let gemini = AiConfig {
            backend: None,
            api_key: Some("k".into()),
            ..Default::default()
        };
        let client = AIClient::from_config(&gemini).unwrap();
        assert_eq!(client.backend_name(), "gemini");
        assert_eq!(client.model(), "gemini-2.5-flash");

        let ollama = AiConfig {
            backend: Some("ollama".into()),
            host: Some("http://localhost:11434/".into()),
            model: Some("gemma3".into()),
            ..Default::default()
        };
        let client = AIClient::from_config(&ollama).unwrap();
        assert_eq!(client.backend_name(), "ollama");
        assert_eq!(client.host(), "http://localhost:11434");
        assert_eq!(client.model(), "gemma3");

        let openai = AiConfig {
            backend: Some("vllm".into()),
            host: Some("http://gpu:8000".into()),
            ..Default::default()
        };
        let client = AIClient::from_config(&openai).unwrap();
        assert_eq!(client.backend_name(), "openai_compatible");

        let switched = client.with_model("other");
        assert_eq!(switched.model(), "other");
    }
}
