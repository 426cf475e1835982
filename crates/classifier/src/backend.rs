//! Classifier backend trait

use crate::ClassifierError;

/// Forward pass of a sequence classification model
///
/// Implementations:
/// - `CandleSequenceClassifier` - BERT/ELECTRA safetensors via Candle
///
/// Must be deterministic: the same text always yields the same logits.
pub trait ClassifierBackend: Send + Sync {
    /// Raw logits, one per label in label-map order
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;

    /// Model name for logging
    fn name(&self) -> &str;
}
