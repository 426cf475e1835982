//! Fixtures shared by the server unit tests

use std::sync::Arc;

use async_trait::async_trait;

use aicc_agent::{
    ClarificationOrchestrator, ClarificationSession, ConversationIdGenerator, MetaInfoBuilder,
    OrchestratorConfig, Outcome, SessionContext,
};
use aicc_classifier::{Classifier, ClassifierBackend, ClassifierError, ConfidencePolicy, LabelMap};
use aicc_config::{CategoryRegistry, Settings};
use aicc_core::{ClarificationLlm, QuestionContext, Result, SelectionContext};

use crate::state::AppState;

pub const CATEGORIES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/categories.yaml");

/// Logits peaked on the first label by `margin`
struct PeakedBackend {
    margin: f32,
    labels: usize,
}

impl ClassifierBackend for PeakedBackend {
    fn logits(&self, _text: &str) -> std::result::Result<Vec<f32>, ClassifierError> {
        let mut logits = vec![0.0; self.labels];
        logits[0] = self.margin;
        Ok(logits)
    }

    fn name(&self) -> &str {
        "peaked"
    }
}

struct CannedLlm;

#[async_trait]
impl ClarificationLlm for CannedLlm {
    async fn generate_question(&self, ctx: QuestionContext<'_>) -> Result<String> {
        Ok(format!("{}번째 질문입니다. 어떤 업무를 원하시나요?", ctx.history.len() + 1))
    }

    async fn select_final_category(&self, _ctx: SelectionContext<'_>) -> Result<String> {
        Ok("\"카드해지\"".to_string())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

fn orchestrator_with_margin(margin: f32) -> ClarificationOrchestrator {
    let registry = Arc::new(CategoryRegistry::load(CATEGORIES_PATH).expect("categories.yaml"));
    let labels = LabelMap::from_labels(registry.all_names().to_vec());
    let classifier = Classifier::new(
        Arc::new(PeakedBackend {
            margin,
            labels: labels.len(),
        }),
        labels,
        ConfidencePolicy::new(registry.thresholds()),
    );
    let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::system()));

    ClarificationOrchestrator::new(
        Arc::new(classifier),
        Arc::new(CannedLlm),
        registry,
        meta,
        OrchestratorConfig::default(),
    )
    .expect("labels match categories.yaml")
}

/// Top-1 well below `threshold_b_low`; every query needs clarification
pub fn low_confidence_orchestrator() -> ClarificationOrchestrator {
    orchestrator_with_margin(1.0)
}

/// Top-1 above `threshold_a`; every query resolves directly
pub fn confident_orchestrator() -> ClarificationOrchestrator {
    orchestrator_with_margin(12.0)
}

pub async fn pending_session(orch: &ClarificationOrchestrator) -> ClarificationSession {
    let (session, outcome) = orch
        .start("카드 문의요", SessionContext::default())
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::AwaitingAnswer { .. }));
    session
}

pub fn app_state(orchestrator: ClarificationOrchestrator) -> AppState {
    let mut settings = Settings::default();
    settings.categories_path = CATEGORIES_PATH.to_string();
    AppState::new(settings, orchestrator)
}
