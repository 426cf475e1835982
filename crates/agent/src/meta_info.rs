//! MetaInfo assembly

use std::sync::Arc;

use aicc_config::CategoryRegistry;
use aicc_core::{
    CategoryScore, ClassificationResult, MetaInfo, RagFilters, ResolvedClassification,
    ResolvedTier, SelectionMethod,
};

use crate::conversation_id::ConversationIdGenerator;

/// Composes classification output with registry metadata.
///
/// Pure apart from the injected id generator, which is only consulted when
/// no conversation id is supplied.
pub struct MetaInfoBuilder {
    registry: Arc<CategoryRegistry>,
    ids: Arc<ConversationIdGenerator>,
}

impl MetaInfoBuilder {
    pub fn new(registry: Arc<CategoryRegistry>, ids: Arc<ConversationIdGenerator>) -> Self {
        Self { registry, ids }
    }

    /// Record for a classification taken as-is (`direct-tier-A` method)
    pub fn build(
        &self,
        text: &str,
        result: &ClassificationResult,
        conversation_id: Option<&str>,
        turn_id: u32,
    ) -> MetaInfo {
        self.compose(
            text,
            &result.category,
            result.confidence,
            ResolvedTier::from(result.tier),
            &result.top_k,
            SelectionMethod::DirectTierA,
            conversation_id,
            turn_id,
        )
    }

    /// Record for a category chosen by forced LLM selection
    pub fn build_forced(
        &self,
        text: &str,
        category: &str,
        confidence: f32,
        top_k: &[CategoryScore],
        conversation_id: Option<&str>,
        turn_id: u32,
    ) -> MetaInfo {
        self.compose(
            text,
            category,
            confidence,
            ResolvedTier::LlmSelected,
            top_k,
            SelectionMethod::ForcedLlmSelection,
            conversation_id,
            turn_id,
        )
    }

    pub fn next_conversation_id(&self) -> String {
        self.ids.next_id()
    }

    #[allow(clippy::too_many_arguments)]
    fn compose(
        &self,
        text: &str,
        category: &str,
        confidence: f32,
        tier: ResolvedTier,
        top_k: &[CategoryScore],
        selection_method: SelectionMethod,
        conversation_id: Option<&str>,
        turn_id: u32,
    ) -> MetaInfo {
        let info = self.registry.lookup(category);
        let conversation_id = conversation_id
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.next_id());

        MetaInfo {
            conversation_id,
            turn_id,
            timestamp: self.ids.clock().now(),
            classification: ResolvedClassification {
                category_name: info.name.clone(),
                domain_code: info.domain_code.clone(),
                domain_name: info.domain_name.clone(),
                intent_code: info.intent_code.clone(),
                category_code: info.category_code.clone(),
                confidence,
                tier,
            },
            query_text: text.to_string(),
            rag_filters: RagFilters {
                index_name: info.rag_index,
                domain_code: info.domain_code,
                category_code: info.category_code,
                active: true,
            },
            top_k_predictions: top_k.to_vec(),
            selection_method,
            clarification: None,
        }
    }
}
