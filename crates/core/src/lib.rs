//! Core traits and types for the contact-center intent pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Error taxonomy shared by classifier, LLM and orchestrator
//! - Classification value types (tiers, top-K scores, results)
//! - Conversation turns and the MetaInfo output record
//! - Capability traits at the seams (`IntentClassifier`, `ClarificationLlm`)

pub mod classification;
pub mod conversation;
pub mod error;
pub mod meta_info;
pub mod traits;

pub use classification::{CategoryScore, ClassificationResult, Tier};
pub use conversation::{effective_query, ConversationTurn};
pub use error::{Error, Result};
pub use meta_info::{
    ClarificationSummary, MetaInfo, RagFilters, ResolvedClassification, ResolvedTier,
    SelectionMethod,
};

pub use traits::{ClarificationLlm, IntentClassifier, QuestionContext, SelectionContext};
