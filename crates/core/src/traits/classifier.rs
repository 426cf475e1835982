//! Intent classifier trait

use crate::{ClassificationResult, Result};

/// Sequence classifier over a fixed category set
///
/// Implementations:
/// - `aicc_classifier::Classifier` - fine-tuned BERT/ELECTRA via Candle
///
/// Implementations hold no mutable state after construction and are shared
/// across sessions behind an `Arc`.
pub trait IntentClassifier: Send + Sync + 'static {
    /// Classify `text` and return the top-K predictions with a tier.
    ///
    /// Fails with `InvalidInput` for blank text or `top_k == 0`; a `top_k`
    /// larger than the label space is clamped.
    fn predict(&self, text: &str, top_k: usize) -> Result<ClassificationResult>;

    /// Category names in model index order
    fn labels(&self) -> &[String];
}
