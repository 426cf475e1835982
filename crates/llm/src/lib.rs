//! LLM integration for the clarification loop
//!
//! Features:
//! - Multiple backend support (Ollama, OpenAI, Azure OpenAI)
//! - Provider factory driven by `LlmSettings`
//! - Korean prompts for clarifying questions and forced category selection
//! - `LlmClarifier`, the `ClarificationLlm` implementation used by the orchestrator

pub mod backend;
pub mod clarifier;
pub mod factory;
pub mod prompt;

pub use backend::{
    FinishReason, GenerationResult, LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend,
    OpenAIConfig,
};
pub use clarifier::LlmClarifier;
pub use factory::{LlmFactory, LlmProvider, LlmProviderConfig};
pub use prompt::{ClarificationPrompts, Message, PromptBuilder, Role};

use std::time::Duration;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Map a request error, recognising client-side timeouts
    pub(crate) fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for aicc_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(after) => aicc_core::Error::LlmTimeout(after),
            LlmError::Configuration(msg) => aicc_core::Error::ConfigInvalid(msg),
            other => aicc_core::Error::LlmUnavailable(other.to_string()),
        }
    }
}
