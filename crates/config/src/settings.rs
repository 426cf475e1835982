//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - missing model artifacts only warn
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Classifier artifact and inference settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Clarification loop budget and LLM bound
    #[serde(default)]
    pub clarification: ClarificationConfig,

    /// LLM provider used for clarification
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Path to the category/domain YAML file
    #[serde(default = "default_categories_path")]
    pub categories_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            classifier: ClassifierConfig::default(),
            clarification: ClarificationConfig::default(),
            llm: LlmSettings::default(),
            observability: ObservabilityConfig::default(),
            categories_path: default_categories_path(),
        }
    }
}

fn default_categories_path() -> String {
    "config/categories.yaml".to_string()
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_classifier()?;
        self.validate_clarification()?;
        self.validate_llm()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Max sessions must be at least 1".to_string(),
            });
        }

        if server.session_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.session_timeout_seconds".to_string(),
                message: "Session timeout must be at least 1 second".to_string(),
            });
        }

        if server.cleanup_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.cleanup_interval_seconds".to_string(),
                message: "Cleanup interval must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.auth.enabled && server.auth.api_key.is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "server.auth.api_key".to_string(),
                message: "API key must be set when auth is enabled in production".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_classifier(&self) -> Result<(), ConfigError> {
        let classifier = &self.classifier;

        if classifier.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "classifier.top_k".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if !(8..=512).contains(&classifier.max_sequence_length) {
            return Err(ConfigError::InvalidValue {
                field: "classifier.max_sequence_length".to_string(),
                message: format!(
                    "Must be between 8 and 512, got {}",
                    classifier.max_sequence_length
                ),
            });
        }

        let model_dir = Path::new(&classifier.model_dir);
        if !model_dir.exists() {
            if self.environment.is_strict() {
                return Err(ConfigError::InvalidValue {
                    field: "classifier.model_dir".to_string(),
                    message: format!("Model directory not found: {}", classifier.model_dir),
                });
            }
            tracing::warn!(
                model_dir = %classifier.model_dir,
                "Classifier model directory not found (required for production)"
            );
        }

        Ok(())
    }

    fn validate_clarification(&self) -> Result<(), ConfigError> {
        let clarification = &self.clarification;

        if clarification.max_turns > 10 {
            return Err(ConfigError::InvalidValue {
                field: "clarification.max_turns".to_string(),
                message: format!("Must be at most 10, got {}", clarification.max_turns),
            });
        }

        if clarification.llm_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "clarification.llm_timeout_ms".to_string(),
                message: "LLM timeout must be positive".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent clarification sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions waiting longer than this for an answer are abandoned
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,

    /// How often abandoned sessions are swept
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Enable authentication (set to false for development)
    #[serde(default)]
    pub enabled: bool,

    /// API key (set via AICC__SERVER__AUTH__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Paths that bypass authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/ready".to_string(),
        "/metrics".to_string(),
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout() -> u64 {
    300
}
fn default_cleanup_interval() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

/// Encoder family of the fine-tuned classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierArchitecture {
    /// BERT encoder, pooler + linear head (`bert.*`, `classifier.*`)
    #[default]
    Bert,
    /// ELECTRA discriminator, dense + out_proj head (`electra.*`, `classifier.dense`, `classifier.out_proj`)
    Electra,
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Directory with config.json, tokenizer.json, model.safetensors, label_map.json
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    #[serde(default)]
    pub architecture: ClassifierArchitecture,

    /// Tokens kept after truncation
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Predictions returned per classification
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Force CPU even when CUDA is available
    #[serde(default = "default_true")]
    pub use_cpu: bool,
}

fn default_model_dir() -> String {
    "models/intent_classifier".to_string()
}
fn default_max_sequence_length() -> usize {
    128
}
fn default_top_k() -> usize {
    3
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            architecture: ClassifierArchitecture::default(),
            max_sequence_length: default_max_sequence_length(),
            top_k: default_top_k(),
            use_cpu: true,
        }
    }
}

/// Clarification loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationConfig {
    /// Questions asked before forced selection; 0 goes straight to forced selection
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Bound on each LLM call
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
}

fn default_max_turns() -> usize {
    3
}
fn default_llm_timeout_ms() -> u64 {
    10_000
}

impl Default for ClarificationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            llm_timeout_ms: default_llm_timeout_ms(),
        }
    }
}

impl ClarificationConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }
}

/// LLM provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// ollama | openai | azure
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Provider endpoint; provider default when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (set via AICC__LLM__API_KEY or the provider's env var)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Azure OpenAI only
    #[serde(default)]
    pub azure_api_version: Option<String>,
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    "qwen3:4b-instruct-2507-q4_K_M".to_string()
}
fn default_llm_max_tokens() -> usize {
    128
}
fn default_llm_temperature() -> f32 {
    0.3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            endpoint: None,
            model: default_llm_model(),
            api_key: None,
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            azure_api_version: None,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (AICC__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("AICC")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
