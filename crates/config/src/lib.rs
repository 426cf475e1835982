//! Configuration management for the intent pipeline
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`AICC__` prefix, `__` separator)
//!
//! # Domain Configuration
//!
//! Categories, their domains and the confidence thresholds live in a separate
//! YAML file (`categories_path`, default `config/categories.yaml`):
//!
//! ```yaml
//! thresholds:
//!   threshold_a: 0.85
//!   threshold_b_low: 0.5
//! domains:
//!   - code: CARD
//!     name: 카드
//!     rag_index: card_docs
//!     categories:
//!       - name: 카드발급
//!         intent_code: CARD_ISSUE
//!         category_code: C001
//! ```
//!
//! The file is turned into an immutable [`CategoryRegistry`] at startup.

pub mod domain;
pub mod settings;

pub use domain::{
    CategoriesConfig, CategoryEntry, CategoryInfo, CategoryRegistry, ConfidenceThresholds,
    DomainEntry, UNKNOWN_CODE,
};
pub use settings::{
    load_settings, AuthConfig, ClarificationConfig, ClassifierArchitecture, ClassifierConfig,
    LlmSettings, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Category registry does not match classifier labels: {0}")]
    LabelMismatch(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for aicc_core::Error {
    fn from(err: ConfigError) -> Self {
        aicc_core::Error::ConfigInvalid(err.to_string())
    }
}
