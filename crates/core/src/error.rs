//! Error taxonomy for the classification and clarification pipeline

use std::time::Duration;
use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Validation errors (`InvalidInput`, `ConfigInvalid`) are never swallowed.
/// LLM errors are surfaced as-is; nothing in the pipeline retries them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Empty or malformed text, or an out-of-range argument from the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The classifier artifact failed to load at construction time
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Registry, label space or thresholds are inconsistent
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The LLM capability failed (network, API or malformed response)
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    /// The LLM capability did not answer within the configured bound
    #[error("LLM timed out after {0:?}")]
    LlmTimeout(Duration),

    /// Forward pass failed on a loaded model
    #[error("Inference error: {0}")]
    Inference(String),

    /// A clarification session was used after it reached a terminal state
    #[error("Session closed: {0}")]
    SessionClosed(String),
}

/// Message shown to the customer-facing flow for any fatal error
pub const ESCALATION_MESSAGE: &str =
    "죄송합니다. 요청을 처리하지 못했습니다. 상담사에게 연결해 드리겠습니다.";

impl Error {
    /// Whether the customer flow must route to a human after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::InvalidInput(_))
    }

    /// Whether the failure came from the LLM capability
    pub fn is_llm_failure(&self) -> bool {
        matches!(self, Error::LlmUnavailable(_) | Error::LlmTimeout(_))
    }

    /// Short machine-readable code for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::ConfigInvalid(_) => "config_invalid",
            Error::LlmUnavailable(_) => "llm_unavailable",
            Error::LlmTimeout(_) => "llm_timeout",
            Error::Inference(_) => "inference_error",
            Error::SessionClosed(_) => "session_closed",
        }
    }

    /// Customer-safe message; raw detail stays in the logs
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(msg) => msg.clone(),
            _ => ESCALATION_MESSAGE.to_string(),
        }
    }
}
