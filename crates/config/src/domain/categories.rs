//! Categories configuration
//!
//! Loaded from `categories.yaml`: the confidence thresholds plus every
//! business domain with its nested categories.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Categories configuration loaded from categories.yaml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub thresholds: ConfidenceThresholds,

    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

impl CategoriesConfig {
    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileNotFound(format!("{}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.thresholds.validate()?;
        Ok(config)
    }

    /// Total number of categories across all domains
    pub fn category_count(&self) -> usize {
        self.domains.iter().map(|d| d.categories.len()).sum()
    }
}

/// Business domain grouping categories that share a retrieval index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    /// Domain code, e.g. `CARD`
    pub code: String,
    /// Display name, e.g. `카드`
    pub name: String,
    /// Default retrieval index for the domain's categories
    pub rag_index: String,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

/// Single category definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Category name; must match a classifier label exactly
    pub name: String,
    pub intent_code: String,
    pub category_code: String,
    /// Overrides the domain's `rag_index`
    #[serde(default)]
    pub rag_index: Option<String>,
}

/// Tier boundaries over the top-1 probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Tier A at or above this value
    #[serde(default = "default_threshold_a")]
    pub threshold_a: f32,
    /// Tier B at or above this value (and below `threshold_a`)
    #[serde(default = "default_threshold_b_low")]
    pub threshold_b_low: f32,
}

fn default_threshold_a() -> f32 {
    0.85
}

fn default_threshold_b_low() -> f32 {
    0.5
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            threshold_a: default_threshold_a(),
            threshold_b_low: default_threshold_b_low(),
        }
    }
}

impl ConfidenceThresholds {
    pub fn new(threshold_a: f32, threshold_b_low: f32) -> Result<Self, ConfigError> {
        let thresholds = Self {
            threshold_a,
            threshold_b_low,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Requires `0 < threshold_b_low < threshold_a < 1`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (a, b_low) = (self.threshold_a, self.threshold_b_low);
        if !(b_low > 0.0 && b_low < a && a < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "thresholds".to_string(),
                message: format!(
                    "expected 0 < threshold_b_low < threshold_a < 1, got threshold_b_low={} threshold_a={}",
                    b_low, a
                ),
            });
        }
        Ok(())
    }
}
