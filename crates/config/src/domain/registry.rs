//! Category registry
//!
//! Immutable lookup table built once from [`CategoriesConfig`]. Its set of
//! names is the single source of truth for which labels are valid.

use std::collections::{HashMap, HashSet};

use super::categories::{CategoriesConfig, ConfidenceThresholds};
use crate::ConfigError;

/// Code used for every field of the unknown-category sentinel
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// Category plus the metadata of its domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub name: String,
    pub domain_code: String,
    pub domain_name: String,
    pub intent_code: String,
    /// Retrieval index, already resolved against the domain default
    pub rag_index: String,
    pub category_code: String,
}

impl CategoryInfo {
    /// Sentinel returned by [`CategoryRegistry::lookup`] for names not in the registry
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_code: UNKNOWN_CODE.to_string(),
            domain_name: UNKNOWN_CODE.to_string(),
            intent_code: UNKNOWN_CODE.to_string(),
            rag_index: UNKNOWN_CODE.to_string(),
            category_code: UNKNOWN_CODE.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category_code == UNKNOWN_CODE && self.domain_code == UNKNOWN_CODE
    }
}

#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: HashMap<String, CategoryInfo>,
    /// Names in configuration order
    names: Vec<String>,
    thresholds: ConfidenceThresholds,
}

impl CategoryRegistry {
    /// Build from parsed configuration.
    ///
    /// Fails on invalid thresholds, blank names, or a name defined twice
    /// (within or across domains).
    pub fn from_config(config: &CategoriesConfig) -> Result<Self, ConfigError> {
        config.thresholds.validate()?;

        let mut categories = HashMap::with_capacity(config.category_count());
        let mut names = Vec::with_capacity(config.category_count());

        for domain in &config.domains {
            for entry in &domain.categories {
                if entry.name.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("domains.{}.categories", domain.code),
                        message: "category name cannot be empty".to_string(),
                    });
                }

                let info = CategoryInfo {
                    name: entry.name.clone(),
                    domain_code: domain.code.clone(),
                    domain_name: domain.name.clone(),
                    intent_code: entry.intent_code.clone(),
                    rag_index: entry
                        .rag_index
                        .clone()
                        .unwrap_or_else(|| domain.rag_index.clone()),
                    category_code: entry.category_code.clone(),
                };

                if let Some(existing) = categories.insert(entry.name.clone(), info) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("domains.{}.categories", domain.code),
                        message: format!(
                            "duplicate category '{}' (already defined in domain {})",
                            entry.name, existing.domain_code
                        ),
                    });
                }
                names.push(entry.name.clone());
            }
        }

        tracing::info!(
            domains = config.domains.len(),
            categories = names.len(),
            threshold_a = config.thresholds.threshold_a,
            threshold_b_low = config.thresholds.threshold_b_low,
            "Loaded category registry"
        );

        Ok(Self {
            categories,
            names,
            thresholds: config.thresholds,
        })
    }

    /// Load and build from a categories YAML file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = CategoriesConfig::load(path)?;
        Self::from_config(&config)
    }

    /// Metadata for `name`, or the [`CategoryInfo::unknown`] sentinel. Never fails.
    pub fn lookup(&self, name: &str) -> CategoryInfo {
        self.categories
            .get(name)
            .cloned()
            .unwrap_or_else(|| CategoryInfo::unknown(name))
    }

    pub fn get(&self, name: &str) -> Option<&CategoryInfo> {
        self.categories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// All category names in configuration order
    pub fn all_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn thresholds(&self) -> ConfidenceThresholds {
        self.thresholds
    }

    /// Check the registry against the classifier's label space.
    ///
    /// Every label must be registered and every registered name must be a
    /// label.
    pub fn validate_label_space(&self, labels: &[String]) -> Result<(), ConfigError> {
        let label_set: HashSet<&str> = labels.iter().map(String::as_str).collect();

        let mut unregistered: Vec<&str> = labels
            .iter()
            .map(String::as_str)
            .filter(|l| !self.categories.contains_key(*l))
            .collect();
        let mut unlabeled: Vec<&str> = self
            .names
            .iter()
            .map(String::as_str)
            .filter(|n| !label_set.contains(n))
            .collect();

        if unregistered.is_empty() && unlabeled.is_empty() {
            return Ok(());
        }

        unregistered.sort_unstable();
        unlabeled.sort_unstable();

        let mut parts = Vec::new();
        if !unregistered.is_empty() {
            parts.push(format!(
                "labels missing from registry: [{}]",
                unregistered.join(", ")
            ));
        }
        if !unlabeled.is_empty() {
            parts.push(format!(
                "categories unknown to classifier: [{}]",
                unlabeled.join(", ")
            ));
        }

        Err(ConfigError::LabelMismatch(parts.join("; ")))
    }
}
