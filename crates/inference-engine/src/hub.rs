//! Model artifacts
//!
//! Resolves the ONNX graph, tokenizer and model config either from a local
//! directory or from the Hugging Face Hub cache, downloading on first use.

use hf_hub::api::sync::{ApiBuilder, ApiError};
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::engine::InferenceConfig;
use crate::InferenceError;

/// Local paths of one model's files
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    /// Reported by health checks
    pub name: String,
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    /// `config.json` with `id2label`, when the model ships one
    pub config: Option<PathBuf>,
}

impl ModelFiles {
    /// `model_dir` when configured, the Hub repository otherwise
    pub fn resolve(config: &InferenceConfig) -> Result<Self, InferenceError> {
        match &config.model_dir {
            Some(dir) => Ok(Self::from_dir(dir)),
            None => Self::fetch(config),
        }
    }

    /// Files laid out flat in `dir`
    pub fn from_dir(dir: &Path) -> Self {
        let config = dir.join("config.json");
        Self {
            name: dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onnx".to_string()),
            model: dir.join("model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
            config: config.is_file().then_some(config),
        }
    }

    /// Download (or reuse cached) files of `config.model_id`
    pub fn fetch(config: &InferenceConfig) -> Result<Self, InferenceError> {
        info!(
            "Fetching model {}@{} from the Hugging Face Hub",
            config.model_id, config.revision
        );

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = &config.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build().map_err(download_err)?;
        let repo = api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            config.revision.clone(),
        ));

        let model = repo.get(&config.model_file).map_err(download_err)?;
        let tokenizer = repo
            .get(&config.tokenizer_file)
            .or_else(|_| repo.get("tokenizer.json"))
            .map_err(download_err)?;
        let model_config = match repo.get("config.json") {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("No config.json for {}: {}", config.model_id, e);
                None
            }
        };

        info!("Model files ready: {}", model.display());
        Ok(Self {
            name: config.model_id.clone(),
            model,
            tokenizer,
            config: model_config,
        })
    }
}

fn download_err(e: ApiError) -> InferenceError {
    InferenceError::ModelDownloadError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dir_layout() {
        let dir = std::env::temp_dir().join(format!("sentiment-model-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let files = ModelFiles::from_dir(&dir);
        assert_eq!(files.model, dir.join("model.onnx"));
        assert_eq!(files.tokenizer, dir.join("tokenizer.json"));
        assert_eq!(files.config, None);

        std::fs::write(dir.join("config.json"), "{}").unwrap();
        let files = ModelFiles::from_dir(&dir);
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(files.config, Some(dir.join("config.json")));
        assert!(files.name.starts_with("sentiment-model-"));
    }

    #[test]
    fn test_model_dir_takes_precedence() {
        let config = InferenceConfig {
            model_dir: Some(PathBuf::from("/opt/models/sst2")),
            ..Default::default()
        };
        let files = ModelFiles::resolve(&config).unwrap();
        assert_eq!(files.name, "sst2");
        assert_eq!(files.model, PathBuf::from("/opt/models/sst2/model.onnx"));
    }

    #[test]
    #[ignore = "downloads from the Hugging Face Hub"]
    fn test_fetch_default_model() {
        let files = ModelFiles::fetch(&InferenceConfig::default()).unwrap();
        assert!(files.model.is_file());
        assert!(files.tokenizer.is_file());
        assert!(files.config.is_some());
    }
}
