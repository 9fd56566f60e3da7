//! Sentiment Inference Engine
//!
//! Wraps a pretrained text-classification model behind a single synchronous
//! call: text in, label and confidence out.

mod engine;
mod hub;
mod lexicon;
mod pool;

pub use engine::{
    build_classifier, ClassifierKind, InferenceConfig, OnnxClassifier, SentimentLabel,
    SentimentResult, DEFAULT_MODEL_ID,
};
pub use hub::ModelFiles;
pub use lexicon::LexiconClassifier;
pub use pool::InferencePool;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Model download failed: {0}")]
    ModelDownloadError(String),
    #[error("Tokenization failed: {0}")]
    TokenizationError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    #[error("Inference worker failed: {0}")]
    WorkerFailed(String),
}

/// A loaded sentiment classifier.
///
/// Implementations are constructed once at startup and are stateless
/// afterwards, so a single instance is shared across all requests.
pub trait SentimentClassifier: Send + Sync {
    /// Classify a single, already validated text
    fn classify(&self, text: &str) -> Result<SentimentResult, InferenceError>;

    /// Short identifier reported by health checks
    fn name(&self) -> &str;
}
