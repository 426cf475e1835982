//! Clarification LLM capability

use async_trait::async_trait;

use crate::{CategoryScore, ConversationTurn, Result};

/// Input for generating one clarifying question
#[derive(Debug, Clone)]
pub struct QuestionContext<'a> {
    /// Original query plus all answers so far
    pub effective_query: &'a str,
    /// Top-K from the latest classification
    pub top_k: &'a [CategoryScore],
    /// Turns already completed in this session
    pub history: &'a [ConversationTurn],
}

/// Input for the forced final selection
#[derive(Debug, Clone)]
pub struct SelectionContext<'a> {
    pub original_query: &'a str,
    pub history: &'a [ConversationTurn],
    pub top_k: &'a [CategoryScore],
    /// Every valid category name; the reply should be one of these
    pub categories: &'a [String],
}

/// Two-operation LLM capability consumed by the clarification loop
///
/// Implementations:
/// - `aicc_llm::LlmClarifier` - any `LlmBackend` (Ollama, OpenAI, Azure)
///
/// Replies are free text. `select_final_category` output is not trusted;
/// the orchestrator validates it against the registry.
#[async_trait]
pub trait ClarificationLlm: Send + Sync + 'static {
    /// Return exactly one natural-language clarifying question
    async fn generate_question(&self, ctx: QuestionContext<'_>) -> Result<String>;

    /// Return one string intended to match a category name
    async fn select_final_category(&self, ctx: SelectionContext<'_>) -> Result<String>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
