//! Capability traits at the pipeline seams
//!
//! Every external dependency of the orchestrator sits behind one of these, so
//! backends can be swapped by configuration and replaced with mocks in tests.
//!
//! ```text
//! IntentClassifier:  text -> ClassificationResult (tiered top-K)
//! ClarificationLlm:  generate_question / select_final_category
//! ```

mod classifier;
mod llm;

pub use classifier::IntentClassifier;
pub use llm::{ClarificationLlm, QuestionContext, SelectionContext};
