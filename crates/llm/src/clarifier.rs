//! `ClarificationLlm` on top of any `LlmBackend`

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use aicc_core::{ClarificationLlm, QuestionContext, Result, SelectionContext};

use crate::backend::LlmBackend;
use crate::prompt::{ClarificationPrompts, Message};
use crate::LlmError;

/// Clarification capability backed by a chat-completion backend
pub struct LlmClarifier {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
}

impl LlmClarifier {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            model_name,
        }
    }

    pub fn backend(&self) -> &Arc<dyn LlmBackend> {
        &self.backend
    }

    async fn complete(&self, operation: &'static str, messages: &[Message]) -> Result<String> {
        let start = Instant::now();
        let result = self.backend.generate(messages).await;
        let elapsed = start.elapsed();

        metrics::histogram!("aicc_llm_request_duration_seconds", "operation" => operation)
            .record(elapsed.as_secs_f64());

        match result {
            Ok(generation) => {
                tracing::debug!(
                    model = %self.model_name,
                    operation,
                    tokens = generation.tokens,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "LLM call completed"
                );
                Ok(generation.text)
            }
            Err(e) => {
                metrics::counter!("aicc_llm_errors_total", "operation" => operation).increment(1);
                tracing::warn!(
                    model = %self.model_name,
                    operation,
                    error = %e,
                    "LLM call failed"
                );
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ClarificationLlm for LlmClarifier {
    async fn generate_question(&self, ctx: QuestionContext<'_>) -> Result<String> {
        let messages = ClarificationPrompts::question(&ctx);
        let reply = self.complete("generate_question", &messages).await?;

        let question = clean_question(&reply);
        if question.is_empty() {
            return Err(LlmError::InvalidResponse("empty clarifying question".to_string()).into());
        }
        Ok(question)
    }

    async fn select_final_category(&self, ctx: SelectionContext<'_>) -> Result<String> {
        let messages = ClarificationPrompts::selection(&ctx);
        let reply = self.complete("select_final_category", &messages).await?;

        // Validity against the registry is decided by the caller
        Ok(first_line(&reply).to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn clean_question(text: &str) -> String {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
        .trim()
        .to_string()
}
