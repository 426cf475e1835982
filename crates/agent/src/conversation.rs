//! Conversation state of one clarification session

use aicc_core::{effective_query, ConversationTurn, Error, Result};

/// Default clarification budget
pub const DEFAULT_MAX_TURNS: usize = 3;

/// Original query plus the append-only clarification history
///
/// `retry_count` never exceeds `max_turns`, and `max_turns` is fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    original_query: String,
    turns: Vec<ConversationTurn>,
    retry_count: usize,
    max_turns: usize,
}

impl ConversationState {
    pub fn new(original_query: impl Into<String>, max_turns: usize) -> Self {
        Self {
            original_query: original_query.into(),
            turns: Vec::new(),
            retry_count: 0,
            max_turns,
        }
    }

    /// Append an answered question
    pub fn record_turn(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<()> {
        if self.retry_count >= self.max_turns {
            return Err(Error::SessionClosed(format!(
                "clarification budget of {} turns exhausted",
                self.max_turns
            )));
        }
        self.turns.push(ConversationTurn::new(question, answer));
        self.retry_count += 1;
        Ok(())
    }

    /// Original query followed by every answer so far
    pub fn effective_query(&self) -> String {
        effective_query(&self.original_query, &self.turns)
    }

    /// Whether another question may be asked
    pub fn has_budget(&self) -> bool {
        self.retry_count < self.max_turns
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}
