//! Inference Pool
//!
//! Model calls are blocking CPU work. They run on tokio's blocking thread
//! pool, at most `max_concurrent` at a time.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::engine::SentimentResult;
use crate::{InferenceError, SentimentClassifier};

/// Dispatches classification calls onto the blocking pool
#[derive(Clone)]
pub struct InferencePool {
    /// Shared classifier, loaded once at startup
    classifier: Arc<dyn SentimentClassifier>,
    /// Concurrency limit for in-flight inferences
    permits: Arc<Semaphore>,
    /// Configured permit count
    max_concurrent: usize,
}

impl InferencePool {
    /// Create a new pool around a loaded classifier
    pub fn new(classifier: Arc<dyn SentimentClassifier>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        info!(
            "Creating inference pool: classifier={}, max_concurrent={}",
            classifier.name(),
            max_concurrent
        );
        Self {
            classifier,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Classify `text` without blocking the calling task's worker thread
    pub async fn classify(&self, text: String) -> Result<SentimentResult, InferenceError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| InferenceError::WorkerFailed(e.to_string()))?;

        let classifier = Arc::clone(&self.classifier);
        let start = std::time::Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            classifier.classify(&text)
        })
        .await
        .map_err(|e| InferenceError::WorkerFailed(e.to_string()))?;

        let elapsed = start.elapsed();
        metrics::histogram!("sentiment_inference_seconds").record(elapsed.as_secs_f64());
        debug!("Inference finished in {}ms", elapsed.as_millis());
        result
    }

    /// Name of the underlying classifier
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Configured concurrency limit
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
