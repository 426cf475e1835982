//! Intent classification
//!
//! Features:
//! - Softmax over the full logit vector with stable top-K ordering
//! - Three-tier confidence policy (A/B/C) over the top-1 probability
//! - Dense label map loading (`label_map.json`)
//! - Fine-tuned BERT/ELECTRA sequence classifiers via Candle (feature `candle`)
//!
//! The model sits behind [`ClassifierBackend`], which only produces logits;
//! everything after the forward pass lives in [`Classifier`].

pub mod backend;
pub mod classifier;
pub mod label_map;
pub mod policy;
pub mod scoring;

#[cfg(feature = "candle")]
pub mod candle_bert;

pub use backend::ClassifierBackend;
pub use classifier::Classifier;
pub use label_map::LabelMap;
pub use policy::{classify_tier, ConfidencePolicy};
pub use scoring::{softmax, top_k};

#[cfg(feature = "candle")]
pub use candle_bert::CandleSequenceClassifier;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Label map error: {0}")]
    LabelMap(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Model returned {actual} logits, expected {expected}")]
    LogitsMismatch { expected: usize, actual: usize },
}

impl From<ClassifierError> for aicc_core::Error {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::LabelMap(_) | ClassifierError::ModelLoad(_) => {
                aicc_core::Error::ModelUnavailable(err.to_string())
            }
            ClassifierError::Inference(_) | ClassifierError::LogitsMismatch { .. } => {
                aicc_core::Error::Inference(err.to_string())
            }
        }
    }
}
