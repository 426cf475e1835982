//! Clarification orchestrator
//!
//! State machine per session:
//!
//! ```text
//! Direct ──tier A──────────────────────────────────────────────► Done
//!   │ tier B/C
//!   ▼
//! Clarifying(1) ─answer─► classify ─tier A───────────────────────► Done
//!   ▲                        │ n < max_turns
//!   └──── Clarifying(n+1) ◄──┤
//!                            │ n == max_turns
//!                            ▼
//!                     ForcedSelection ─validate/fallback─────────► Done
//! ```
//!
//! The wait for a customer answer is outside the orchestrator: `start`
//! and `submit_answer` each return either the resolved [`MetaInfo`] or the
//! next question. Dropping a session abandons it. Any classifier or LLM
//! error moves the session to `Aborted`.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use aicc_config::{CategoryRegistry, Settings};
use aicc_core::{
    ClarificationLlm, ClarificationSummary, ClassificationResult, Error, IntentClassifier,
    MetaInfo, QuestionContext, Result, SelectionContext, SelectionMethod,
};

use crate::conversation::{ConversationState, DEFAULT_MAX_TURNS};
use crate::meta_info::MetaInfoBuilder;
use crate::selection::{validate_or_fallback, Selection};

/// Orchestrator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Clarifying questions before forced selection
    pub max_turns: usize,
    /// Predictions requested per classification
    pub top_k: usize,
    /// Bound on each LLM call
    pub llm_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            top_k: 3,
            llm_timeout: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_turns: settings.clarification.max_turns,
            top_k: settings.classifier.top_k,
            llm_timeout: settings.clarification.llm_timeout(),
        }
    }
}

/// Where a session is in the clarification loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Before the first classification
    Direct,
    /// Question `n` (1-based) is waiting for an answer
    Clarifying(usize),
    /// Budget exhausted, waiting on the forced selection
    ForcedSelection,
    Done,
    /// Closed by a classifier or LLM error
    Aborted,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Done | SessionPhase::Aborted)
    }
}

/// Caller-supplied identity of a session
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Generated when absent
    pub conversation_id: Option<String>,
    pub turn_id: u32,
}

/// One customer query being resolved
#[derive(Debug, Clone)]
pub struct ClarificationSession {
    conversation_id: String,
    turn_id: u32,
    state: ConversationState,
    phase: SessionPhase,
    pending_question: Option<String>,
    last_result: Option<ClassificationResult>,
}

impl ClarificationSession {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn turn_id(&self) -> u32 {
        self.turn_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Question currently waiting for an answer
    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    /// Latest classification attempt
    pub fn last_result(&self) -> Option<&ClassificationResult> {
        self.last_result.as_ref()
    }
}

/// Result of advancing a session
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(MetaInfo),
    /// Clarifying question `turn` (1-based) must be answered next
    AwaitingAnswer { question: String, turn: usize },
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }
}

/// Confidence-gated clarification loop
pub struct ClarificationOrchestrator {
    classifier: Arc<dyn IntentClassifier>,
    llm: Arc<dyn ClarificationLlm>,
    registry: Arc<CategoryRegistry>,
    meta: MetaInfoBuilder,
    config: OrchestratorConfig,
    fallback_count: AtomicU64,
    aborted_count: AtomicU64,
}

impl ClarificationOrchestrator {
    /// Wire the loop together.
    ///
    /// Fails with `ConfigInvalid` when the classifier's labels and the
    /// registry's category names differ. A classifier with no labels (model
    /// not loaded) is accepted and fails on each `predict` instead.
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        llm: Arc<dyn ClarificationLlm>,
        registry: Arc<CategoryRegistry>,
        meta: MetaInfoBuilder,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        if !classifier.labels().is_empty() {
            registry.validate_label_space(classifier.labels())?;
        }

        Ok(Self {
            classifier,
            llm,
            registry,
            meta,
            config,
            fallback_count: AtomicU64::new(0),
            aborted_count: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    pub fn classifier(&self) -> &Arc<dyn IntentClassifier> {
        &self.classifier
    }

    /// Forced selections that named an unknown category since startup
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    /// Sessions ended by a classifier or LLM error since startup
    pub fn aborted_count(&self) -> u64 {
        self.aborted_count.load(Ordering::Relaxed)
    }

    /// Classify `query` and either resolve it or ask the first question.
    ///
    /// The returned session is terminal when the outcome is resolved. A
    /// blank query is rejected with `InvalidInput` before a session exists.
    pub async fn start(
        &self,
        query: &str,
        ctx: SessionContext,
    ) -> Result<(ClarificationSession, Outcome)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query is empty".to_string()));
        }

        let conversation_id = ctx
            .conversation_id
            .unwrap_or_else(|| self.meta.next_conversation_id());

        let mut session = ClarificationSession {
            conversation_id,
            turn_id: ctx.turn_id,
            state: ConversationState::new(query, self.config.max_turns),
            phase: SessionPhase::Direct,
            pending_question: None,
            last_result: None,
        };

        let result = self
            .classifier
            .predict(session.state.original_query(), self.config.top_k);
        let result = match result {
            Ok(result) => result,
            Err(e) => return Err(self.abort(&mut session, e)),
        };
        tracing::info!(
            conversation_id = %session.conversation_id,
            category = %result.category,
            confidence = result.confidence,
            tier = %result.tier,
            "Initial classification"
        );

        if !result.tier.needs_clarification() {
            let meta = self.meta.build(
                session.state.original_query(),
                &result,
                Some(session.conversation_id.as_str()),
                session.turn_id,
            );
            session.last_result = Some(result);
            session.phase = SessionPhase::Done;
            record_session_outcome("direct");
            return Ok((session, Outcome::Resolved(meta)));
        }

        session.last_result = Some(result);
        let outcome = self.advance_unresolved(&mut session).await;
        let outcome = self.close_on_error(&mut session, outcome)?;
        Ok((session, outcome))
    }

    /// Fold an answer into the session and re-classify.
    ///
    /// An empty answer is rejected with `InvalidInput` and leaves the
    /// session untouched.
    pub async fn submit_answer(
        &self,
        session: &mut ClarificationSession,
        answer: &str,
    ) -> Result<Outcome> {
        let turn = match session.phase {
            SessionPhase::Clarifying(n) => n,
            phase => {
                return Err(Error::SessionClosed(format!(
                    "session {} is not awaiting an answer ({:?})",
                    session.conversation_id, phase
                )))
            }
        };

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::InvalidInput("answer is empty".to_string()));
        }

        let question = session.pending_question.take().unwrap_or_default();
        session.state.record_turn(question, answer)?;

        let outcome = self.classify_answer(session, turn).await;
        self.close_on_error(session, outcome)
    }

    async fn classify_answer(
        &self,
        session: &mut ClarificationSession,
        turn: usize,
    ) -> Result<Outcome> {
        let query = session.state.effective_query();
        let result = self.classifier.predict(&query, self.config.top_k)?;
        tracing::info!(
            conversation_id = %session.conversation_id,
            turn,
            category = %result.category,
            confidence = result.confidence,
            tier = %result.tier,
            "Re-classified after clarification"
        );

        if !result.tier.needs_clarification() {
            let mut meta = self.meta.build(
                &query,
                &result,
                Some(session.conversation_id.as_str()),
                session.turn_id,
            );
            meta.selection_method = SelectionMethod::TierAAfterClarification;
            meta.clarification = Some(summary(&session.state, false));

            session.last_result = Some(result);
            session.phase = SessionPhase::Done;
            record_session_outcome("clarified");
            return Ok(Outcome::Resolved(meta));
        }

        session.last_result = Some(result);
        self.advance_unresolved(session).await
    }

    /// Ask the next question, or force a selection once the budget is spent
    async fn advance_unresolved(&self, session: &mut ClarificationSession) -> Result<Outcome> {
        if session.state.has_budget() {
            self.ask_question(session).await
        } else {
            self.force_selection(session).await
        }
    }

    async fn ask_question(&self, session: &mut ClarificationSession) -> Result<Outcome> {
        let query = session.state.effective_query();
        let top_k = session
            .last_result
            .as_ref()
            .map(|r| r.top_k.as_slice())
            .unwrap_or(&[]);

        let question = self
            .bounded(self.llm.generate_question(QuestionContext {
                effective_query: &query,
                top_k,
                history: session.state.turns(),
            }))
            .await?;

        let turn = session.state.retry_count() + 1;
        metrics::counter!("aicc_clarification_questions_total").increment(1);
        tracing::debug!(
            conversation_id = %session.conversation_id,
            turn,
            question = %question,
            "Asking clarifying question"
        );

        session.pending_question = Some(question.clone());
        session.phase = SessionPhase::Clarifying(turn);
        Ok(Outcome::AwaitingAnswer { question, turn })
    }

    async fn force_selection(&self, session: &mut ClarificationSession) -> Result<Outcome> {
        session.phase = SessionPhase::ForcedSelection;

        let last = session
            .last_result
            .clone()
            .ok_or_else(|| Error::SessionClosed("no classification to select from".to_string()))?;

        let raw = self
            .bounded(self.llm.select_final_category(SelectionContext {
                original_query: session.state.original_query(),
                history: session.state.turns(),
                top_k: &last.top_k,
                categories: self.registry.all_names(),
            }))
            .await?;

        let selection = validate_or_fallback(&raw, &self.registry, &last.category);
        if let Selection::Fallback(event) = &selection {
            self.fallback_count.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("aicc_unknown_category_fallback_total").increment(1);
            tracing::warn!(
                conversation_id = %session.conversation_id,
                llm_output = %event.llm_output,
                fallback_category = %event.fallback_category,
                "Forced selection returned unknown category, using top-1 prediction"
            );
        }

        let category = selection.category();
        let confidence = last.probability_of(category).unwrap_or(0.0);
        let mut meta = self.meta.build_forced(
            &session.state.effective_query(),
            category,
            confidence,
            &last.top_k,
            Some(session.conversation_id.as_str()),
            session.turn_id,
        );
        meta.clarification = Some(summary(&session.state, selection.is_fallback()));

        tracing::info!(
            conversation_id = %session.conversation_id,
            category = %category,
            fallback = selection.is_fallback(),
            turns = session.state.retry_count(),
            "Resolved by forced selection"
        );

        session.phase = SessionPhase::Done;
        record_session_outcome("forced");
        Ok(Outcome::Resolved(meta))
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.llm_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::LlmTimeout(self.config.llm_timeout)),
        }
    }

    fn close_on_error(
        &self,
        session: &mut ClarificationSession,
        outcome: Result<Outcome>,
    ) -> Result<Outcome> {
        outcome.map_err(|e| self.abort(session, e))
    }

    fn abort(&self, session: &mut ClarificationSession, error: Error) -> Error {
        session.phase = SessionPhase::Aborted;
        session.pending_question = None;
        self.aborted_count.fetch_add(1, Ordering::Relaxed);
        record_session_outcome("aborted");
        tracing::error!(
            conversation_id = %session.conversation_id,
            error = %error,
            code = error.code(),
            "Clarification session aborted"
        );
        error
    }
}

fn summary(state: &ConversationState, fallback_applied: bool) -> ClarificationSummary {
    ClarificationSummary {
        original_query: state.original_query().to_string(),
        turns: state.turns().to_vec(),
        clarification_turns: state.retry_count(),
        fallback_applied,
    }
}

fn record_session_outcome(outcome: &'static str) {
    metrics::counter!("aicc_sessions_total", "outcome" => outcome).increment(1);
}

/// Supplies customer answers to [`run_to_completion`]
#[async_trait]
pub trait AnswerSource: Send {
    async fn answer(&mut self, question: &str) -> Result<String>;
}

/// Answers from a fixed list, in order
#[derive(Debug, Clone, Default)]
pub struct ScriptedAnswers {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedAnswers {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Questions received so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

#[async_trait]
impl AnswerSource for ScriptedAnswers {
    async fn answer(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| Error::SessionClosed("no scripted answer left".to_string()))
    }
}

/// Drive a session to a resolved MetaInfo, pulling answers from `answers`
pub async fn run_to_completion<A: AnswerSource + ?Sized>(
    orchestrator: &ClarificationOrchestrator,
    query: &str,
    ctx: SessionContext,
    answers: &mut A,
) -> Result<MetaInfo> {
    let (mut session, mut outcome) = orchestrator.start(query, ctx).await?;
    loop {
        match outcome {
            Outcome::Resolved(meta) => return Ok(meta),
            Outcome::AwaitingAnswer { question, .. } => {
                let answer = answers.answer(&question).await?;
                outcome = orchestrator.submit_answer(&mut session, &answer).await?;
            }
        }
    }
}
