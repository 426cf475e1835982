//! Clarification turns and effective-query reconstruction

use serde::{Deserialize, Serialize};

/// One clarification exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Question posed to the customer
    pub question: String,
    /// Customer's answer
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Original query followed by every answer so far, space-joined in order.
///
/// Pure function of its inputs, so re-deriving it from the same turns
/// always yields the same string.
pub fn effective_query(original_query: &str, turns: &[ConversationTurn]) -> String {
    let mut query = original_query.trim().to_string();
    for turn in turns {
        let answer = turn.answer.trim();
        if answer.is_empty() {
            continue;
        }
        if !query.is_empty() {
            query.push(' ');
        }
        query.push_str(answer);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_query_without_turns() {
        assert_eq!(effective_query("카드 만들고 싶어요", &[]), "카드 만들고 싶어요");
    }

    #[test]
    fn test_effective_query_preserves_order() {
        let turns = vec![
            ConversationTurn::new("어떤 카드를 원하시나요?", "신용카드요"),
            ConversationTurn::new("새로 발급하시나요?", " 네 신규 발급 "),
        ];
        let query = effective_query("카드 문의", &turns);
        assert_eq!(query, "카드 문의 신용카드요 네 신규 발급");
        // Idempotent
        assert_eq!(query, effective_query("카드 문의", &turns));
    }

    #[test]
    fn test_effective_query_grows_monotonically() {
        let mut turns = Vec::new();
        let mut previous = effective_query("대출", &turns);
        for (i, answer) in ["주택", "담보", "금리"].iter().enumerate() {
            turns.push(ConversationTurn::new(format!("질문 {}", i + 1), *answer));
            let next = effective_query("대출", &turns);
            assert!(next.starts_with(&previous));
            assert!(next.ends_with(answer));
            previous = next;
        }
        assert_eq!(previous, "대출 주택 담보 금리");
    }
}
