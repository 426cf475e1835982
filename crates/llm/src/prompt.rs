//! Prompt Building
//!
//! Constructs the two prompts the clarification loop needs: one clarifying
//! question, and a forced choice over the known category names.

use std::fmt;

use aicc_core::{CategoryScore, ConversationTurn, QuestionContext, SelectionContext};
use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Prompt builder
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Replay clarification turns as assistant question / user answer pairs
    pub fn with_turns(mut self, turns: &[ConversationTurn]) -> Self {
        for turn in turns {
            self.messages.push(Message::assistant(turn.question.clone()));
            self.messages.push(Message::user(turn.answer.clone()));
        }
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

const QUESTION_SYSTEM_PROMPT: &str = "당신은 금융회사 AI 콜센터의 상담 보조입니다. \
고객의 문의가 어떤 업무에 해당하는지 아직 확실하지 않습니다. \
아래 후보 업무들을 구분할 수 있도록 고객에게 짧고 정중한 확인 질문을 딱 하나만 하세요. \
질문 문장만 출력하고 설명이나 번호, 따옴표는 붙이지 마세요.";

const SELECTION_SYSTEM_PROMPT: &str = "당신은 금융회사 AI 콜센터의 문의 분류기입니다. \
고객의 원래 문의와 확인 질문에 대한 답변을 보고 가장 알맞은 업무 카테고리를 하나 고르세요. \
반드시 주어진 카테고리 목록에 있는 이름을 글자 그대로 하나만 출력하고, 다른 말은 덧붙이지 마세요.";

/// Prompt templates for the clarification loop
pub struct ClarificationPrompts;

impl ClarificationPrompts {
    /// Messages asking for exactly one clarifying question
    pub fn question(ctx: &QuestionContext<'_>) -> Vec<Message> {
        let mut request = String::new();
        request.push_str("고객 문의: ");
        request.push_str(ctx.effective_query);
        request.push_str("\n\n후보 업무 (확률 순):\n");
        push_candidates(&mut request, ctx.top_k);
        request.push_str("\n후보를 구분할 확인 질문 하나를 작성하세요.");

        PromptBuilder::new()
            .system(QUESTION_SYSTEM_PROMPT)
            .with_turns(ctx.history)
            .user(request)
            .build()
    }

    /// Messages asking for one category name out of `ctx.categories`
    pub fn selection(ctx: &SelectionContext<'_>) -> Vec<Message> {
        let mut request = String::new();
        request.push_str("원래 문의: ");
        request.push_str(ctx.original_query);
        request.push('\n');

        if !ctx.history.is_empty() {
            request.push_str("\n확인 대화:\n");
            for (i, turn) in ctx.history.iter().enumerate() {
                request.push_str(&format!(
                    "{}. 질문: {}\n   답변: {}\n",
                    i + 1,
                    turn.question,
                    turn.answer
                ));
            }
        }

        request.push_str("\n분류기 후보 (확률 순):\n");
        push_candidates(&mut request, ctx.top_k);

        request.push_str("\n카테고리 목록:\n");
        for name in ctx.categories {
            request.push_str("- ");
            request.push_str(name);
            request.push('\n');
        }
        request.push_str("\n카테고리 이름:");

        PromptBuilder::new()
            .system(SELECTION_SYSTEM_PROMPT)
            .user(request)
            .build()
    }
}

fn push_candidates(out: &mut String, top_k: &[CategoryScore]) {
    for score in top_k {
        out.push_str(&format!(
            "- {} ({:.1}%)\n",
            score.category,
            score.probability * 100.0
        ));
    }
}
