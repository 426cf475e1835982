//! Clarification orchestration
//!
//! Features:
//! - Conversation state with a bounded clarification budget
//! - Process-local conversation ids (`conv_{YYYYMMDD}_{seq:06}`)
//! - MetaInfo assembly from a classification and the category registry
//! - Registry-validated forced selection with top-1 fallback
//! - `ClarificationOrchestrator`, the start/answer state machine

pub mod conversation;
pub mod conversation_id;
pub mod meta_info;
pub mod orchestrator;
pub mod selection;

pub use conversation::ConversationState;
pub use conversation_id::{Clock, ConversationIdGenerator, FixedClock, SystemClock};
pub use meta_info::MetaInfoBuilder;
pub use orchestrator::{
    run_to_completion, AnswerSource, ClarificationOrchestrator, ClarificationSession,
    OrchestratorConfig, Outcome, ScriptedAnswers, SessionContext, SessionPhase,
};
pub use selection::{validate_or_fallback, Selection, UnknownCategoryFallback};
