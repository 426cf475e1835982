//! LLM Factory - Provider Abstraction Layer
//!
//! Creates LLM backends from `LlmSettings`.
//!
//! ## Supported Providers
//! - **Ollama**: local models (default)
//! - **OpenAI**: OpenAI API or any OpenAI-compatible server
//! - **Azure OpenAI**: Azure-hosted deployments
//!
//! ## Example
//! ```ignore
//! let config = LlmProviderConfig::from_settings(&settings.llm, timeout)?;
//! let llm = LlmFactory::create_clarifier(&config)?;
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use aicc_config::LlmSettings;
use aicc_core::ClarificationLlm;

use crate::backend::{LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend, OpenAIConfig};
use crate::clarifier::LlmClarifier;
use crate::LlmError;

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenAI,
    AzureOpenAI,
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" | "local" => Ok(LlmProvider::Ollama),
            "openai" | "gpt" => Ok(LlmProvider::OpenAI),
            "azure" | "azure-openai" => Ok(LlmProvider::AzureOpenAI),
            other => Err(LlmError::Configuration(format!(
                "unknown LLM provider '{}'",
                other
            ))),
        }
    }
}

/// Unified LLM provider configuration
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    /// API key (OpenAI/Azure)
    pub api_key: Option<String>,
    /// API endpoint; provider default when unset
    pub endpoint: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// HTTP client timeout
    pub timeout: Duration,
    /// Azure API version (Azure OpenAI only)
    pub azure_api_version: Option<String>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            api_key: None,
            endpoint: None,
            model: "qwen3:4b-instruct-2507-q4_K_M".to_string(),
            max_tokens: 128,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            azure_api_version: None,
        }
    }
}

impl LlmProviderConfig {
    /// Build from application settings
    pub fn from_settings(settings: &LlmSettings, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            provider: settings.provider.parse()?,
            api_key: settings.api_key.clone(),
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout,
            azure_api_version: settings.azure_api_version.clone(),
        })
    }

    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Ollama,
            endpoint: Some(DEFAULT_OLLAMA_ENDPOINT.to_string()),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: Some(api_key.into()),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::AzureOpenAI,
            api_key: Some(api_key.into()),
            endpoint: Some(endpoint.into()),
            model: deployment.into(),
            azure_api_version: Some(api_version.into()),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Factory for creating LLM backends
pub struct LlmFactory;

impl LlmFactory {
    /// Create a raw chat backend
    pub fn create_backend(config: &LlmProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
        match config.provider {
            LlmProvider::Ollama => {
                let ollama_config = LlmConfig {
                    model: config.model.clone(),
                    endpoint: config
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    timeout: config.timeout,
                    ..Default::default()
                };
                Ok(Arc::new(OllamaBackend::new(ollama_config)?))
            }

            LlmProvider::OpenAI => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .unwrap_or_default();

                let mut openai_config = OpenAIConfig::openai(api_key, &config.model);
                if let Some(ref endpoint) = config.endpoint {
                    openai_config.endpoint = endpoint.clone();
                }
                openai_config.max_tokens = config.max_tokens;
                openai_config.temperature = config.temperature;
                openai_config.timeout = config.timeout;

                Ok(Arc::new(OpenAIBackend::new(openai_config)?))
            }

            LlmProvider::AzureOpenAI => {
                let endpoint = config.endpoint.clone().ok_or_else(|| {
                    LlmError::Configuration("Azure OpenAI requires endpoint".to_string())
                })?;
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("AZURE_OPENAI_API_KEY").ok())
                    .ok_or_else(|| {
                        LlmError::Configuration("Azure OpenAI requires api_key".to_string())
                    })?;
                let api_version = config
                    .azure_api_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());

                let mut azure_config =
                    OpenAIConfig::azure(endpoint, api_key, &config.model, api_version);
                azure_config.max_tokens = config.max_tokens;
                azure_config.temperature = config.temperature;
                azure_config.timeout = config.timeout;

                Ok(Arc::new(OpenAIBackend::new(azure_config)?))
            }
        }
    }

    /// Create the clarification capability (implements the core trait)
    pub fn create_clarifier(
        config: &LlmProviderConfig,
    ) -> Result<Arc<dyn ClarificationLlm>, LlmError> {
        let backend = Self::create_backend(config)?;
        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            "Created clarification LLM"
        );
        Ok(Arc::new(LlmClarifier::from_arc(backend)))
    }
}
