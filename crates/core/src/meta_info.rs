//! MetaInfo output record handed to retrieval/response generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classification::{CategoryScore, Tier};
use crate::conversation::ConversationTurn;

/// Tier as reported in the final record.
///
/// `LlmSelected` marks a category resolved by forced LLM selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedTier {
    A,
    B,
    C,
    #[serde(rename = "LLM_SELECTED")]
    LlmSelected,
}

impl From<Tier> for ResolvedTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::A => ResolvedTier::A,
            Tier::B => ResolvedTier::B,
            Tier::C => ResolvedTier::C,
        }
    }
}

impl fmt::Display for ResolvedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTier::A => f.write_str("A"),
            ResolvedTier::B => f.write_str("B"),
            ResolvedTier::C => f.write_str("C"),
            ResolvedTier::LlmSelected => f.write_str("LLM_SELECTED"),
        }
    }
}

/// How the final category was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    #[serde(rename = "direct-tier-A")]
    DirectTierA,
    #[serde(rename = "tier-A-after-clarification")]
    TierAAfterClarification,
    #[serde(rename = "forced-llm-selection")]
    ForcedLlmSelection,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::DirectTierA => "direct-tier-A",
            SelectionMethod::TierAAfterClarification => "tier-A-after-clarification",
            SelectionMethod::ForcedLlmSelection => "forced-llm-selection",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved category with its registry metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedClassification {
    pub category_name: String,
    pub domain_code: String,
    pub domain_name: String,
    pub intent_code: String,
    pub category_code: String,
    pub confidence: f32,
    pub tier: ResolvedTier,
}

/// Filter parameters for the downstream retrieval collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagFilters {
    pub index_name: String,
    pub domain_code: String,
    pub category_code: String,
    pub active: bool,
}

/// Clarification history attached when the session did not resolve directly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationSummary {
    pub original_query: String,
    pub turns: Vec<ConversationTurn>,
    pub clarification_turns: usize,
    /// True when forced selection returned an unknown name and the last
    /// top-1 prediction was substituted
    pub fallback_applied: bool,
}

/// Final output record of one classification (possibly clarified)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub conversation_id: String,
    pub turn_id: u32,
    pub timestamp: DateTime<Utc>,
    pub classification: ResolvedClassification,
    /// Query text the retrieval collaborator should search with
    pub query_text: String,
    pub rag_filters: RagFilters,
    /// Top-K from the last classification attempt
    pub top_k_predictions: Vec<CategoryScore>,
    pub selection_method: SelectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<ClarificationSummary>,
}
