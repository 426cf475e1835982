//! Classifier facade implementing `IntentClassifier`

use std::sync::Arc;

use aicc_config::{ClassifierConfig, ConfidenceThresholds};
use aicc_core::{ClassificationResult, Error, IntentClassifier, Result};

use crate::backend::ClassifierBackend;
use crate::label_map::LabelMap;
use crate::policy::ConfidencePolicy;
use crate::scoring::{softmax, top_k};
use crate::ClassifierError;

enum ModelState {
    Ready {
        backend: Arc<dyn ClassifierBackend>,
        labels: Vec<String>,
    },
    /// Load failed; every call reports this reason
    Unavailable(String),
}

/// Intent classifier over a fixed label set
///
/// Construction never fails: a model that cannot be loaded leaves the
/// classifier in an unavailable state and `predict` fails fast with
/// `ModelUnavailable`.
pub struct Classifier {
    state: ModelState,
    policy: ConfidencePolicy,
}

impl Classifier {
    pub fn new(
        backend: Arc<dyn ClassifierBackend>,
        labels: LabelMap,
        policy: ConfidencePolicy,
    ) -> Self {
        Self {
            state: ModelState::Ready {
                backend,
                labels: labels.into_labels(),
            },
            policy,
        }
    }

    pub fn unavailable(reason: impl Into<String>, policy: ConfidencePolicy) -> Self {
        let reason = reason.into();
        tracing::error!(reason = %reason, "Intent classifier unavailable");
        Self {
            state: ModelState::Unavailable(reason),
            policy,
        }
    }

    /// Load the configured model artifact
    #[cfg(feature = "candle")]
    pub fn from_config(config: &ClassifierConfig, thresholds: ConfidenceThresholds) -> Self {
        let policy = ConfidencePolicy::new(thresholds);
        match crate::candle_bert::CandleSequenceClassifier::load(config) {
            Ok((backend, labels)) => {
                tracing::info!(
                    model = %backend.name(),
                    labels = labels.len(),
                    "Intent classifier loaded"
                );
                Self::new(Arc::new(backend), labels, policy)
            }
            Err(e) => Self::unavailable(e.to_string(), policy),
        }
    }

    /// Load the configured model artifact (always unavailable without Candle)
    #[cfg(not(feature = "candle"))]
    pub fn from_config(config: &ClassifierConfig, thresholds: ConfidenceThresholds) -> Self {
        Self::unavailable(
            format!(
                "cannot load {}: built without the `candle` feature",
                config.model_dir
            ),
            ConfidencePolicy::new(thresholds),
        )
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Unavailable(reason) => Some(reason.as_str()),
            ModelState::Ready { .. } => None,
        }
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }
}

impl IntentClassifier for Classifier {
    fn predict(&self, text: &str, k: usize) -> Result<ClassificationResult> {
        let (backend, labels) = match &self.state {
            ModelState::Ready { backend, labels } => (backend, labels),
            ModelState::Unavailable(reason) => {
                return Err(Error::ModelUnavailable(reason.clone()))
            }
        };

        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text is empty".to_string()));
        }
        if k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".to_string()));
        }

        let logits = backend.logits(text)?;
        if logits.len() != labels.len() {
            return Err(ClassifierError::LogitsMismatch {
                expected: labels.len(),
                actual: logits.len(),
            }
            .into());
        }

        let probabilities = softmax(&logits);
        let top = top_k(&probabilities, labels, k);
        let confidence = top.first().map(|s| s.probability).unwrap_or(0.0);
        let tier = self.policy.tier(confidence);

        metrics::counter!("aicc_classifications_total", "tier" => tier.as_str()).increment(1);
        tracing::debug!(
            model = %backend.name(),
            category = top.first().map(|s| s.category.as_str()).unwrap_or(""),
            confidence,
            tier = %tier,
            "Classified utterance"
        );

        ClassificationResult::from_top_k(top, tier)
            .ok_or_else(|| Error::Inference("model produced no predictions".to_string()))
    }

    fn labels(&self) -> &[String] {
        match &self.state {
            ModelState::Ready { labels, .. } => labels.as_slice(),
            ModelState::Unavailable(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicc_core::Tier;

    struct FixedLogits(Vec<f32>);

    impl ClassifierBackend for FixedLogits {
        fn logits(&self, _text: &str) -> std::result::Result<Vec<f32>, ClassifierError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn classifier(logits: Vec<f32>) -> Classifier {
        let labels = LabelMap::from_labels(vec![
            "카드발급".to_string(),
            "카드해지".to_string(),
            "대출상담".to_string(),
        ]);
        Classifier::new(
            Arc::new(FixedLogits(logits)),
            labels,
            ConfidencePolicy::default(),
        )
    }

    #[test]
    fn test_predict_orders_top_k() {
        let c = classifier(vec![0.5, 3.0, 1.0]);
        let result = c.predict("카드 없애고 싶어요", 3).unwrap();
        assert_eq!(result.category, "카드해지");
        assert_eq!(result.top_k.len(), 3);
        assert_eq!(result.top_k[1].category, "대출상담");
        assert_eq!(result.confidence, result.top_k[0].probability);
        assert!(result.top_k.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_predict_assigns_tier() {
        let c = classifier(vec![10.0, 0.0, 0.0]);
        assert_eq!(c.predict("카드 만들래요", 1).unwrap().tier, Tier::A);

        let c = classifier(vec![0.0, 0.0, 0.0]);
        assert_eq!(c.predict("음", 1).unwrap().tier, Tier::C);
    }

    #[test]
    fn test_top_k_clamped() {
        let c = classifier(vec![1.0, 2.0, 3.0]);
        let result = c.predict("대출", 10).unwrap();
        assert_eq!(result.top_k.len(), 3);
    }

    #[test]
    fn test_invalid_input() {
        let c = classifier(vec![1.0, 2.0, 3.0]);
        assert!(matches!(c.predict("   ", 3), Err(Error::InvalidInput(_))));
        assert!(matches!(c.predict("", 3), Err(Error::InvalidInput(_))));
        assert!(matches!(c.predict("카드", 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_logits_length_mismatch() {
        let c = classifier(vec![1.0, 2.0]);
        assert!(matches!(c.predict("카드", 3), Err(Error::Inference(_))));
    }

    #[test]
    fn test_unavailable_fails_fast() {
        let c = Classifier::unavailable("weights missing", ConfidencePolicy::default());
        assert!(!c.is_available());
        assert_eq!(c.unavailable_reason(), Some("weights missing"));
        assert!(c.labels().is_empty());

        match c.predict("카드 발급", 3) {
            Err(Error::ModelUnavailable(reason)) => assert_eq!(reason, "weights missing"),
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
        // Recorded once, reported on every call
        assert!(matches!(c.predict("대출", 3), Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn test_deterministic() {
        let c = classifier(vec![0.3, 0.2, 0.1]);
        let a = c.predict("카드", 3).unwrap();
        let b = c.predict("카드", 3).unwrap();
        assert_eq!(a, b);
    }

    #[cfg(not(feature = "candle"))]
    #[test]
    fn test_from_config_without_candle() {
        let c = Classifier::from_config(
            &ClassifierConfig::default(),
            ConfidenceThresholds::default(),
        );
        assert!(!c.is_available());
        assert!(c.unavailable_reason().unwrap().contains("candle"));
    }
}
