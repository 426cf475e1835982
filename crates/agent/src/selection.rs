//! Forced-selection validation

use aicc_config::CategoryRegistry;

/// A forced selection named a category the registry does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategoryFallback {
    /// Raw LLM output
    pub llm_output: String,
    /// Top-1 category substituted for it
    pub fallback_category: String,
}

/// Outcome of validating a forced selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Valid(String),
    Fallback(UnknownCategoryFallback),
}

impl Selection {
    /// Category to report; always a registry member when `top1` is
    pub fn category(&self) -> &str {
        match self {
            Selection::Valid(name) => name,
            Selection::Fallback(event) => &event.fallback_category,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Selection::Fallback(_))
    }
}

const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』'];

fn normalize(name: &str) -> &str {
    let mut s = name.trim();
    loop {
        let stripped = s.trim_matches(QUOTES).trim();
        if stripped == s {
            return s;
        }
        s = stripped;
    }
}

/// Accept `name` if it is a registered category after trimming whitespace
/// and wrapping quotes, otherwise fall back to `top1`. Never fails.
pub fn validate_or_fallback(name: &str, registry: &CategoryRegistry, top1: &str) -> Selection {
    let candidate = normalize(name);
    if registry.contains(candidate) {
        return Selection::Valid(candidate.to_string());
    }

    Selection::Fallback(UnknownCategoryFallback {
        llm_output: name.to_string(),
        fallback_category: top1.to_string(),
    })
}
