//! End-to-end clarification scenarios against scripted classifier and LLM

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use aicc_agent::{
    run_to_completion, ClarificationOrchestrator, ConversationIdGenerator, FixedClock,
    MetaInfoBuilder, OrchestratorConfig, Outcome, ScriptedAnswers, SessionContext, SessionPhase,
};
use aicc_classifier::ConfidencePolicy;
use aicc_config::{CategoriesConfig, CategoryRegistry, ConfidenceThresholds};
use aicc_core::{
    CategoryScore, ClarificationLlm, ClassificationResult, Error, IntentClassifier,
    QuestionContext, ResolvedTier, Result, SelectionContext, SelectionMethod,
};

const CATEGORIES: &str = r#"
thresholds:
  threshold_a: 0.85
  threshold_b_low: 0.5
domains:
  - code: CARD
    name: 카드
    rag_index: card_docs
    categories:
      - name: 카드발급
        intent_code: CARD_ISSUE
        category_code: C001
      - name: 카드해지
        intent_code: CARD_CANCEL
        category_code: C002
      - name: 카드분실신고
        intent_code: CARD_LOST
        category_code: C003
        rag_index: card_security_docs
  - code: LOAN
    name: 대출
    rag_index: loan_docs
    categories:
      - name: 대출상담
        intent_code: LOAN_CONSULT
        category_code: L001
"#;

/// Returns scripted predictions in order, repeating the last one
struct ScriptedClassifier {
    script: Mutex<VecDeque<Vec<(&'static str, f32)>>>,
    last: Mutex<Vec<(&'static str, f32)>>,
    queries: Mutex<Vec<String>>,
    labels: Vec<String>,
    policy: ConfidencePolicy,
}

impl ScriptedClassifier {
    fn new(script: Vec<Vec<(&'static str, f32)>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            labels: ["카드발급", "카드해지", "카드분실신고", "대출상담"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            policy: ConfidencePolicy::new(ConfidenceThresholds::new(0.85, 0.5).unwrap()),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl IntentClassifier for ScriptedClassifier {
    fn predict(&self, text: &str, top_k: usize) -> Result<ClassificationResult> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text is empty".to_string()));
        }
        self.queries.lock().push(text.to_string());

        let scores = match self.script.lock().pop_front() {
            Some(next) => {
                *self.last.lock() = next.clone();
                next
            }
            None => self.last.lock().clone(),
        };
        let top_k: Vec<CategoryScore> = scores
            .into_iter()
            .take(top_k)
            .map(|(name, p)| CategoryScore::new(name, p))
            .collect();
        let tier = self.policy.tier(top_k[0].probability);
        ClassificationResult::from_top_k(top_k, tier)
            .ok_or_else(|| Error::Inference("empty script".to_string()))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[derive(Default)]
struct MockLlm {
    selection_reply: String,
    fail: bool,
    delay: Option<Duration>,
    question_calls: AtomicUsize,
    selection_calls: AtomicUsize,
    selection_top_k: Mutex<Vec<CategoryScore>>,
    selection_categories: Mutex<Vec<String>>,
}

impl MockLlm {
    fn replying(selection: &str) -> Self {
        Self {
            selection_reply: selection.to_string(),
            ..Default::default()
        }
    }

    fn total_calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst) + self.selection_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClarificationLlm for MockLlm {
    async fn generate_question(&self, ctx: QuestionContext<'_>) -> Result<String> {
        let n = self.question_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::LlmUnavailable("connection refused".to_string()));
        }
        Ok(format!("질문 {} ({}개 후보)", n, ctx.top_k.len()))
    }

    async fn select_final_category(&self, ctx: SelectionContext<'_>) -> Result<String> {
        self.selection_calls.fetch_add(1, Ordering::SeqCst);
        *self.selection_top_k.lock() = ctx.top_k.to_vec();
        *self.selection_categories.lock() = ctx.categories.to_vec();
        if self.fail {
            return Err(Error::LlmUnavailable("connection refused".to_string()));
        }
        Ok(self.selection_reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

fn orchestrator(
    classifier: Arc<ScriptedClassifier>,
    llm: Arc<MockLlm>,
    max_turns: usize,
) -> ClarificationOrchestrator {
    let config = CategoriesConfig::from_yaml(CATEGORIES).unwrap();
    let registry = Arc::new(CategoryRegistry::from_config(&config).unwrap());
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
    let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::new(clock)));

    ClarificationOrchestrator::new(
        classifier,
        llm,
        registry,
        meta,
        OrchestratorConfig {
            max_turns,
            top_k: 3,
            llm_timeout: Duration::from_millis(200),
        },
    )
    .unwrap()
}

fn low(top: &'static str) -> Vec<(&'static str, f32)> {
    vec![(top, 0.40), ("카드해지", 0.30), ("대출상담", 0.20)]
}

#[tokio::test]
async fn test_direct_tier_a() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![vec![
        ("카드분실신고", 0.95),
        ("카드해지", 0.03),
    ]]));
    let llm = Arc::new(MockLlm::default());
    let orch = orchestrator(classifier, llm.clone(), 3);

    let (session, outcome) = orch
        .start("카드를 잃어버렸어요", SessionContext::default())
        .await
        .unwrap();

    let meta = match outcome {
        Outcome::Resolved(meta) => meta,
        other => panic!("expected resolution, got {:?}", other),
    };
    assert_eq!(meta.classification.category_name, "카드분실신고");
    assert_eq!(meta.classification.tier, ResolvedTier::A);
    assert_eq!(meta.selection_method, SelectionMethod::DirectTierA);
    assert_eq!(meta.rag_filters.index_name, "card_security_docs");
    assert_eq!(meta.query_text, "카드를 잃어버렸어요");
    assert_eq!(meta.conversation_id, "conv_20240601_000001");
    assert!(meta.clarification.is_none());

    assert_eq!(session.phase(), SessionPhase::Done);
    assert_eq!(llm.total_calls(), 0);
}

#[tokio::test]
async fn test_clarify_then_resolve() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        vec![("카드발급", 0.55), ("카드해지", 0.30)],
        vec![("카드발급", 0.90), ("카드해지", 0.05)],
    ]));
    let llm = Arc::new(MockLlm::default());
    let orch = orchestrator(classifier.clone(), llm.clone(), 3);

    let ctx = SessionContext {
        conversation_id: Some("conv_fixed".to_string()),
        turn_id: 4,
    };
    let (mut session, outcome) = orch.start("카드 문의요", ctx).await.unwrap();
    assert_eq!(session.last_result().unwrap().tier, aicc_core::Tier::B);
    match outcome {
        Outcome::AwaitingAnswer { turn, ref question } => {
            assert_eq!(turn, 1);
            assert_eq!(session.pending_question(), Some(question.as_str()));
        }
        other => panic!("expected a question, got {:?}", other),
    }
    assert_eq!(session.phase(), SessionPhase::Clarifying(1));

    let outcome = orch.submit_answer(&mut session, "새로 만들고 싶어요").await.unwrap();
    let meta = match outcome {
        Outcome::Resolved(meta) => meta,
        other => panic!("expected resolution, got {:?}", other),
    };

    assert_eq!(meta.selection_method, SelectionMethod::TierAAfterClarification);
    assert_eq!(meta.classification.tier, ResolvedTier::A);
    assert_eq!(meta.conversation_id, "conv_fixed");
    assert_eq!(meta.turn_id, 4);
    assert_eq!(meta.query_text, "카드 문의요 새로 만들고 싶어요");

    let summary = meta.clarification.expect("summary");
    assert_eq!(summary.clarification_turns, 1);
    assert_eq!(summary.original_query, "카드 문의요");
    assert!(!summary.fallback_applied);

    assert_eq!(classifier.queries(), vec!["카드 문의요", "카드 문의요 새로 만들고 싶어요"]);
    assert_eq!(llm.question_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.phase(), SessionPhase::Done);
}

#[tokio::test]
async fn test_exhaustion_with_valid_selection() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm::replying("카드해지"));
    let orch = orchestrator(classifier, llm.clone(), 2);

    let mut answers = ScriptedAnswers::new(["글쎄요", "잘 모르겠어요"]);
    let meta = run_to_completion(&orch, "카드", SessionContext::default(), &mut answers)
        .await
        .unwrap();

    assert_eq!(meta.classification.category_name, "카드해지");
    assert_eq!(meta.classification.tier, ResolvedTier::LlmSelected);
    assert_eq!(meta.selection_method, SelectionMethod::ForcedLlmSelection);
    assert!((meta.classification.confidence - 0.30).abs() < 1e-6);

    let summary = meta.clarification.expect("summary");
    assert_eq!(summary.clarification_turns, 2);
    assert!(!summary.fallback_applied);

    assert_eq!(answers.asked().len(), 2);
    assert_eq!(orch.fallback_count(), 0);
    assert_eq!(llm.selection_categories.lock().len(), 4);
}

#[tokio::test]
async fn test_exhaustion_with_unknown_selection_falls_back() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm::replying("최고급카드발급"));
    let orch = orchestrator(classifier, llm, 1);

    let mut answers = ScriptedAnswers::new(["그냥 카드요"]);
    let meta = run_to_completion(&orch, "카드", SessionContext::default(), &mut answers)
        .await
        .unwrap();

    assert_eq!(meta.classification.category_name, "카드발급");
    assert_eq!(meta.classification.domain_code, "CARD");
    assert_eq!(meta.classification.tier, ResolvedTier::LlmSelected);
    assert!(meta.clarification.unwrap().fallback_applied);
    assert_eq!(orch.fallback_count(), 1);
}

#[tokio::test]
async fn test_turn_budget_bounds_llm_calls() {
    for max_turns in 0..=4 {
        let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
        let llm = Arc::new(MockLlm::replying("카드발급"));
        let orch = orchestrator(classifier, llm.clone(), max_turns);

        let mut answers = ScriptedAnswers::new((0..10).map(|i| format!("답변 {}", i)));
        let meta = run_to_completion(&orch, "카드", SessionContext::default(), &mut answers)
            .await
            .unwrap();

        assert_eq!(meta.selection_method, SelectionMethod::ForcedLlmSelection);
        assert_eq!(llm.question_calls.load(Ordering::SeqCst), max_turns);
        assert_eq!(llm.selection_calls.load(Ordering::SeqCst), 1);
        assert_eq!(llm.total_calls(), max_turns + 1);
        assert_eq!(meta.clarification.unwrap().clarification_turns, max_turns);
    }
}

#[tokio::test]
async fn test_zero_turns_goes_straight_to_selection() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("대출상담")]));
    let llm = Arc::new(MockLlm::replying("대출상담"));
    let orch = orchestrator(classifier, llm.clone(), 0);

    let (session, outcome) = orch.start("대출", SessionContext::default()).await.unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(session.phase(), SessionPhase::Done);
    assert_eq!(llm.question_calls.load(Ordering::SeqCst), 0);

    if let Outcome::Resolved(meta) = outcome {
        assert_eq!(meta.classification.category_name, "대출상담");
        assert_eq!(meta.query_text, "대출");
        let summary = meta.clarification.unwrap();
        assert_eq!(summary.clarification_turns, 0);
        assert!(summary.turns.is_empty());
    }
}

#[tokio::test]
async fn test_empty_answer_leaves_session_unchanged() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm::replying("카드발급"));
    let orch = orchestrator(classifier.clone(), llm, 3);

    let (mut session, _) = orch.start("카드", SessionContext::default()).await.unwrap();
    let before = session.clone();

    let err = orch.submit_answer(&mut session, "   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(!err.is_fatal());

    assert_eq!(session.phase(), before.phase());
    assert_eq!(session.state(), before.state());
    assert_eq!(session.pending_question(), before.pending_question());
    assert_eq!(classifier.queries().len(), 1);

    // Still answerable afterwards
    let outcome = orch.submit_answer(&mut session, "체크카드요").await.unwrap();
    assert!(matches!(outcome, Outcome::AwaitingAnswer { turn: 2, .. }));
}

#[tokio::test]
async fn test_answer_after_done_is_rejected() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![vec![("카드해지", 0.99)]]));
    let orch = orchestrator(classifier, Arc::new(MockLlm::default()), 3);

    let (mut session, _) = orch.start("카드 해지요", SessionContext::default()).await.unwrap();
    let err = orch.submit_answer(&mut session, "네").await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_llm_timeout() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let orch = orchestrator(classifier, llm, 3);

    let err = orch.start("카드", SessionContext::default()).await.unwrap_err();
    assert_eq!(err, Error::LlmTimeout(Duration::from_millis(200)));
    assert!(err.is_fatal());
    assert!(err.is_llm_failure());
}

#[tokio::test]
async fn test_llm_error_aborts_session() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        vec![("카드발급", 0.60), ("카드해지", 0.30)],
    ]));
    let llm = Arc::new(MockLlm {
        fail: true,
        ..Default::default()
    });
    let orch = orchestrator(classifier, llm, 0);

    let err = orch.start("카드", SessionContext::default()).await.unwrap_err();
    assert!(matches!(err, Error::LlmUnavailable(_)));
    assert_eq!(orch.fallback_count(), 0);
}

#[tokio::test]
async fn test_llm_error_mid_session_marks_aborted() {
    struct FailSecond(AtomicUsize);

    #[async_trait]
    impl ClarificationLlm for FailSecond {
        async fn generate_question(&self, _ctx: QuestionContext<'_>) -> Result<String> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok("어떤 카드인가요?".to_string())
            } else {
                Err(Error::LlmUnavailable("HTTP 500".to_string()))
            }
        }

        async fn select_final_category(&self, _ctx: SelectionContext<'_>) -> Result<String> {
            Ok("카드발급".to_string())
        }

        fn model_name(&self) -> &str {
            "fail-second"
        }
    }

    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let config = CategoriesConfig::from_yaml(CATEGORIES).unwrap();
    let registry = Arc::new(CategoryRegistry::from_config(&config).unwrap());
    let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::system()));
    let orch = ClarificationOrchestrator::new(
        classifier,
        Arc::new(FailSecond(AtomicUsize::new(0))),
        registry,
        meta,
        OrchestratorConfig::default(),
    )
    .unwrap();

    let (mut session, _) = orch.start("카드", SessionContext::default()).await.unwrap();
    let err = orch.submit_answer(&mut session, "몰라요").await.unwrap_err();
    assert!(matches!(err, Error::LlmUnavailable(_)));
    assert_eq!(session.phase(), SessionPhase::Aborted);
    assert!(session.pending_question().is_none());

    assert_eq!(orch.aborted_count(), 1);

    let err = orch.submit_answer(&mut session, "다시요").await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed(_)));
    assert_eq!(orch.aborted_count(), 1);
}

/// Fails every prediction, recording the text it was given
struct DownClassifier {
    queries: Mutex<Vec<String>>,
    labels: Vec<String>,
}

impl IntentClassifier for DownClassifier {
    fn predict(&self, text: &str, _top_k: usize) -> Result<ClassificationResult> {
        self.queries.lock().push(text.to_string());
        Err(Error::Inference("CUDA out of memory".to_string()))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[tokio::test]
async fn test_initial_classifier_error_aborts() {
    let classifier = Arc::new(DownClassifier {
        queries: Mutex::new(Vec::new()),
        labels: Vec::new(),
    });
    let config = CategoriesConfig::from_yaml(CATEGORIES).unwrap();
    let registry = Arc::new(CategoryRegistry::from_config(&config).unwrap());
    let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::system()));
    let orch = ClarificationOrchestrator::new(
        classifier.clone(),
        Arc::new(MockLlm::default()),
        registry,
        meta,
        OrchestratorConfig::default(),
    )
    .unwrap();

    let err = orch
        .start("  카드 잃어버렸어요 \n", SessionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert_eq!(orch.aborted_count(), 1);
    assert_eq!(*classifier.queries.lock(), vec!["카드 잃어버렸어요".to_string()]);
}

#[tokio::test]
async fn test_blank_query_rejected_before_session() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm::default());
    let orch = orchestrator(classifier.clone(), llm.clone(), 3);

    let err = orch.start("   ", SessionContext::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(orch.aborted_count(), 0);
    assert!(classifier.queries().is_empty());
}

#[tokio::test]
async fn test_label_mismatch_rejected_at_construction() {
    let config = CategoriesConfig::from_yaml(CATEGORIES).unwrap();
    let registry = Arc::new(CategoryRegistry::from_config(&config).unwrap());
    let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::system()));
    let classifier = Arc::new(DownClassifier {
        queries: Mutex::new(Vec::new()),
        labels: ["카드발급", "카드해지", "적금가입"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    });

    let err = ClarificationOrchestrator::new(
        classifier,
        Arc::new(MockLlm::default()),
        registry,
        meta,
        OrchestratorConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::ConfigInvalid(ref msg) if msg.contains("적금가입")));
}

#[tokio::test]
async fn test_selection_uses_last_top_k() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        vec![("카드발급", 0.45), ("카드해지", 0.35)],
        vec![("대출상담", 0.48), ("카드발급", 0.32)],
    ]));
    let llm = Arc::new(MockLlm::replying("없는업무"));
    let orch = orchestrator(classifier, llm.clone(), 1);

    let mut answers = ScriptedAnswers::new(["대출도 있어요"]);
    let meta = run_to_completion(&orch, "카드", SessionContext::default(), &mut answers)
        .await
        .unwrap();

    let seen = llm.selection_top_k.lock().clone();
    assert_eq!(seen[0].category, "대출상담");
    assert_eq!(meta.top_k_predictions, seen);
    assert_eq!(meta.classification.category_name, "대출상담");
    assert!((meta.classification.confidence - 0.48).abs() < 1e-6);
    assert!(meta.clarification.unwrap().fallback_applied);
}

#[tokio::test]
async fn test_effective_query_grows_by_answers() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![low("카드발급")]));
    let llm = Arc::new(MockLlm::replying("카드발급"));
    let orch = orchestrator(classifier.clone(), llm, 3);

    let mut answers = ScriptedAnswers::new(["체크카드", "신규", "오늘"]);
    let meta = run_to_completion(&orch, "카드", SessionContext::default(), &mut answers)
        .await
        .unwrap();

    let queries = classifier.queries();
    assert_eq!(queries.len(), 4);
    for pair in queries.windows(2) {
        assert!(pair[1].starts_with(&pair[0]));
        assert!(pair[1].len() > pair[0].len());
    }
    assert_eq!(queries[3], "카드 체크카드 신규 오늘");
    assert_eq!(meta.query_text, "카드 체크카드 신규 오늘");
}
