//! Classification value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence tier over the top-1 probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Below `threshold_b_low`
    C,
    /// Between `threshold_b_low` (inclusive) and `threshold_a` (exclusive)
    B,
    /// At or above `threshold_a`; trusted directly
    A,
}

impl Tier {
    /// Tiers below A require clarification
    pub fn needs_clarification(&self) -> bool {
        !matches!(self, Tier::A)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (category, probability) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub probability: f32,
}

impl CategoryScore {
    pub fn new(category: impl Into<String>, probability: f32) -> Self {
        Self {
            category: category.into(),
            probability,
        }
    }
}

/// Output of one classifier invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Top-1 category name
    pub category: String,
    /// Top-1 probability
    pub confidence: f32,
    /// Tier assigned by the confidence policy
    pub tier: Tier,
    /// Top-K predictions, descending by probability
    pub top_k: Vec<CategoryScore>,
}

impl ClassificationResult {
    /// Build from an already ordered top-K list.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_top_k(top_k: Vec<CategoryScore>, tier: Tier) -> Option<Self> {
        let first = top_k.first()?;
        Some(Self {
            category: first.category.clone(),
            confidence: first.probability,
            tier,
            top_k,
        })
    }

    /// Probability of `category` if it is among the top-K
    pub fn probability_of(&self, category: &str) -> Option<f32> {
        self.top_k
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.probability)
    }
}
