//! ONNX Sentiment Classifier
//!
//! Runs a Hugging Face style sequence-classification export
//! (`model.onnx` + `tokenizer.json`) through tract.

use crate::hub::ModelFiles;
use crate::lexicon::LexiconClassifier;
use crate::{InferenceError, SentimentClassifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, warn};
use tract_onnx::prelude::*;

/// Sentiment category predicted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    /// All labels, in display order
    pub const ALL: [SentimentLabel; 2] = [SentimentLabel::Positive, SentimentLabel::Negative];

    /// Get string representation (as stored in the log table)
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }

    /// The opposite polarity
    pub fn flipped(&self) -> Self {
        match self {
            SentimentLabel::Positive => SentimentLabel::Negative,
            SentimentLabel::Negative => SentimentLabel::Positive,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(SentimentLabel::Positive),
            "negative" | "neg" => Ok(SentimentLabel::Negative),
            other => Err(InferenceError::InvalidOutput(format!(
                "unknown sentiment label '{}'",
                other
            ))),
        }
    }
}

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Predicted label
    pub label: SentimentLabel,
    /// Confidence score (0.0 to 1.0)
    pub score: f64,
}

impl SentimentResult {
    /// Create a result, clamping the score into [0, 1]
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        Self {
            label,
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Pretrained model served by default
pub const DEFAULT_MODEL_ID: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

/// Classifier implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Pretrained ONNX model, from `model_dir` or the Hugging Face Hub
    Onnx,
    /// Built-in word lists, no model files needed
    Lexicon,
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub classifier: ClassifierKind,
    /// Hub repository of the model
    pub model_id: String,
    /// Hub revision (branch, tag or commit)
    pub revision: String,
    /// ONNX graph path inside the repository
    pub model_file: String,
    /// Tokenizer path inside the repository
    pub tokenizer_file: String,
    /// Hub cache location, `HF_HOME` based default when unset
    pub cache_dir: Option<PathBuf>,
    /// Local directory holding `model.onnx`, `tokenizer.json` and optionally
    /// `config.json`. Takes precedence over `model_id`.
    pub model_dir: Option<PathBuf>,
    /// Fixed token window fed to the model
    pub max_sequence_length: usize,
    /// Concurrent inference calls allowed (0 = available parallelism)
    pub max_concurrent_inferences: usize,
    /// Label for each output index when the model has no `id2label`
    pub labels: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::Onnx,
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: "main".to_string(),
            model_file: "onnx/model.onnx".to_string(),
            tokenizer_file: "onnx/tokenizer.json".to_string(),
            cache_dir: None,
            model_dir: None,
            max_sequence_length: 256,
            max_concurrent_inferences: 0,
            labels: vec!["NEGATIVE".to_string(), "POSITIVE".to_string()],
        }
    }
}

impl InferenceConfig {
    /// Resolved number of inference permits
    pub fn concurrency(&self) -> usize {
        if self.max_concurrent_inferences > 0 {
            return self.max_concurrent_inferences;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Build the process-wide classifier from configuration
pub fn build_classifier(
    config: &InferenceConfig,
) -> Result<Arc<dyn SentimentClassifier>, InferenceError> {
    match config.classifier {
        ClassifierKind::Onnx => {
            let files = ModelFiles::resolve(config)?;
            Ok(Arc::new(OnnxClassifier::load(&files, config)?))
        }
        ClassifierKind::Lexicon => {
            warn!("Lexicon classifier selected, no pretrained model in use");
            Ok(Arc::new(LexiconClassifier::new()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    #[serde(default)]
    id2label: BTreeMap<String, String>,
}

/// Role of a model input, derived from its graph name
#[derive(Debug, Clone, Copy, PartialEq)]
enum ModelInput {
    TokenIds,
    AttentionMask,
    TokenTypeIds,
}

impl ModelInput {
    fn from_name(name: &str) -> Self {
        if name.contains("mask") {
            ModelInput::AttentionMask
        } else if name.contains("type") {
            ModelInput::TokenTypeIds
        } else {
            ModelInput::TokenIds
        }
    }
}

/// Pretrained sequence classifier executed with tract
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    tokenizer: Tokenizer,
    inputs: Vec<ModelInput>,
    labels: Vec<SentimentLabel>,
    sequence_length: usize,
    name: String,
}

impl OnnxClassifier {
    /// Load the model graph and tokenizer
    pub fn load(files: &ModelFiles, config: &InferenceConfig) -> Result<Self, InferenceError> {
        let model_path = &files.model;
        let tokenizer_path = &files.tokenizer;
        let sequence_length = config.max_sequence_length.max(2);
        info!("Loading ONNX model: {}", model_path.display());

        let load_err = |e: TractError| InferenceError::ModelLoadError(e.to_string());

        let mut model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(load_err)?;

        let inputs: Vec<ModelInput> = model
            .input_outlets()
            .map_err(load_err)?
            .iter()
            .map(|outlet| ModelInput::from_name(&model.node(outlet.node).name))
            .collect();

        for ix in 0..inputs.len() {
            model = model
                .with_input_fact(ix, i64::fact([1, sequence_length]).into())
                .map_err(load_err)?;
        }

        let plan = model
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: sequence_length,
                ..Default::default()
            }))
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        let labels = Self::load_labels(files.config.as_deref(), config)?;
        let name = files.name.clone();

        info!(
            "Model loaded: {} ({} inputs, {} labels, window {})",
            name,
            inputs.len(),
            labels.len(),
            sequence_length
        );

        Ok(Self {
            plan,
            tokenizer,
            inputs,
            labels,
            sequence_length,
            name,
        })
    }

    /// Labels from `config.json` when present, configured labels otherwise
    fn load_labels(
        config_path: Option<&std::path::Path>,
        config: &InferenceConfig,
    ) -> Result<Vec<SentimentLabel>, InferenceError> {
        let raw = config_path.map(std::fs::read_to_string).transpose();
        let names: Vec<String> = match raw {
            Ok(Some(raw)) => {
                let parsed: ModelConfigFile = serde_json::from_str(&raw)
                    .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;
                let mut indexed = parsed
                    .id2label
                    .into_iter()
                    .map(|(k, v)| {
                        k.parse::<usize>().map(|ix| (ix, v)).map_err(|_| {
                            InferenceError::ModelLoadError(format!("bad id2label key '{}'", k))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                indexed.sort_by_key(|(ix, _)| *ix);
                indexed.into_iter().map(|(_, v)| v).collect()
            }
            Ok(None) => {
                debug!("No config.json, using configured labels");
                Vec::new()
            }
            Err(e) => {
                return Err(InferenceError::ModelLoadError(format!(
                    "reading config.json: {}",
                    e
                )))
            }
        };

        let names = if names.is_empty() { config.labels.clone() } else { names };
        // Generic names such as LABEL_0 resolve through the configured table
        let labels = names
            .iter()
            .enumerate()
            .map(|(ix, name)| {
                name.parse::<SentimentLabel>().or_else(|e| {
                    config
                        .labels
                        .get(ix)
                        .ok_or(e)
                        .and_then(|fallback| fallback.parse::<SentimentLabel>())
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        if labels.is_empty() {
            return Err(InferenceError::ModelLoadError("no labels configured".to_string()));
        }
        Ok(labels)
    }

    fn encode(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>), InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::TokenizationError(e.to_string()))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        if ids.is_empty() {
            return Err(InferenceError::TokenizationError("no tokens produced".to_string()));
        }

        ids.resize(self.sequence_length, 0);
        mask.resize(self.sequence_length, 0);
        Ok((ids, mask))
    }

    fn to_tensor(&self, values: Vec<i64>) -> Result<Tensor, InferenceError> {
        tract_ndarray::Array2::from_shape_vec((1, self.sequence_length), values)
            .map(|a| a.into_tensor())
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

impl SentimentClassifier for OnnxClassifier {
    fn classify(&self, text: &str) -> Result<SentimentResult, InferenceError> {
        let start = std::time::Instant::now();
        let (ids, mask) = self.encode(text)?;

        let mut inputs: TVec<TValue> = tvec!();
        for input in &self.inputs {
            let values = match input {
                ModelInput::TokenIds => ids.clone(),
                ModelInput::AttentionMask => mask.clone(),
                ModelInput::TokenTypeIds => vec![0; self.sequence_length],
            };
            inputs.push(self.to_tensor(values)?.into());
        }

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let logits: Vec<f32> = outputs
            .first()
            .ok_or_else(|| InferenceError::InvalidOutput("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
            .iter()
            .copied()
            .collect();

        let result = select_label(&logits, &self.labels)?;
        debug!(
            "Inference completed in {}ms: {} ({:.4})",
            start.elapsed().as_millis(),
            result.label,
            result.score
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Softmax over the logits, picking the most probable label
fn select_label(logits: &[f32], labels: &[SentimentLabel]) -> Result<SentimentResult, InferenceError> {
    if logits.len() != labels.len() {
        return Err(InferenceError::InvalidOutput(format!(
            "expected {} logits, got {}",
            labels.len(),
            logits.len()
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(InferenceError::InvalidOutput("non-finite logits".to_string()));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    let (best, prob) = exps
        .iter()
        .enumerate()
        .map(|(ix, e)| (ix, e / sum))
        .fold((0, f64::MIN), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

    Ok(SentimentResult::new(labels[best], prob))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SST2: [SentimentLabel; 2] = [SentimentLabel::Negative, SentimentLabel::Positive];

    #[test]
    fn test_select_label_softmax() {
        // Logits of distilbert-sst2 for a clearly positive sentence
        let result = select_label(&[-4.2, 4.3], &SST2).unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!((result.score - 0.9998).abs() < 0.001);

        let result = select_label(&[2.0, -1.0], &SST2).unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
        assert!(result.score > 0.5 && result.score < 1.0);
    }

    #[test]
    fn test_select_label_rejects_bad_output() {
        assert!(select_label(&[0.1], &SST2).is_err());
        assert!(select_label(&[f32::NAN, 0.0], &SST2).is_err());
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("POSITIVE".parse::<SentimentLabel>().unwrap(), SentimentLabel::Positive);
        assert_eq!("negative".parse::<SentimentLabel>().unwrap(), SentimentLabel::Negative);
        assert!("LABEL_0".parse::<SentimentLabel>().is_err());
        assert_eq!(SentimentLabel::Positive.to_string(), "POSITIVE");
    }

    #[test]
    fn test_generic_model_labels_use_configured_table() {
        let path = std::env::temp_dir().join(format!("sentiment-labels-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"id2label": {"1": "LABEL_1", "0": "LABEL_0"}}"#).unwrap();

        let labels = OnnxClassifier::load_labels(Some(path.as_path()), &InferenceConfig::default());
        std::fs::remove_file(&path).ok();
        assert_eq!(labels.unwrap(), SST2.to_vec());
    }

    #[test]
    fn test_labels_without_model_config() {
        let labels = OnnxClassifier::load_labels(None, &InferenceConfig::default()).unwrap();
        assert_eq!(labels, SST2.to_vec());
    }

    #[test]
    fn test_label_serde() {
        let json = serde_json::to_string(&SentimentLabel::Negative).unwrap();
        assert_eq!(json, "\"NEGATIVE\"");
    }

    #[test]
    fn test_result_score_clamped() {
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, 1.2).score, 1.0);
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, -0.1).score, 0.0);
    }

    #[test]
    fn test_missing_model_dir_fails_to_load() {
        let config = InferenceConfig {
            model_dir: Some(PathBuf::from("/nonexistent/model")),
            ..Default::default()
        };
        assert!(matches!(
            build_classifier(&config),
            Err(InferenceError::ModelLoadError(_))
        ));
    }

    #[test]
    fn test_lexicon_kind_builds_lexicon() {
        let config = InferenceConfig {
            classifier: ClassifierKind::Lexicon,
            ..Default::default()
        };
        let classifier = build_classifier(&config).unwrap();
        assert_eq!(classifier.name(), "lexicon");
    }

    #[test]
    fn test_default_serves_pretrained_model() {
        let config = InferenceConfig::default();
        assert_eq!(config.classifier, ClassifierKind::Onnx);
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    #[ignore = "downloads the DistilBERT SST-2 ONNX export from the Hugging Face Hub"]
    fn test_pretrained_model_classifies_positive_sentence() {
        let classifier = build_classifier(&InferenceConfig::default()).unwrap();

        let result = classifier.classify("Hey this project is pretty cool!").unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!(result.score > 0.99, "score {}", result.score);

        let result = classifier.classify("This was a terrible waste of time").unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
    }
}
