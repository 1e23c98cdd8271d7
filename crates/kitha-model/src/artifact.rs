//! Raw model artifacts: the directory a trainer writes and the export
//! pipeline reads.

use crate::classifier::{LinearClassifier, NUM_LABELS};
use crate::error::{ModelError, ModelResult};
use crate::tensor::WeightsFile;
use crate::tokenizer::{SpecialTokensMap, WordPieceTokenizer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MODEL_TYPE: &str = "kitha-nb";

/// File layout of a raw model directory.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    root: PathBuf,
}

impl ModelLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    #[must_use]
    pub fn vocab_path(&self) -> PathBuf {
        self.root.join("vocab.txt")
    }

    #[must_use]
    pub fn special_tokens_path(&self) -> PathBuf {
        self.root.join("special_tokens_map.json")
    }

    #[must_use]
    pub fn weights_path(&self) -> PathBuf {
        self.root.join("model_weights.json")
    }

    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.root.join("metrics.json")
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("training_manifest.json")
    }

    pub fn ensure_dirs(&self) -> ModelResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// `config.json` of a raw model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: String,
    pub num_labels: usize,
    pub id2label: BTreeMap<String, String>,
    pub max_position_embeddings: usize,
    pub vocab_size: usize,
}

impl ModelConfig {
    #[must_use]
    pub fn new(vocab_size: usize, max_length: usize) -> Self {
        Self {
            model_type: MODEL_TYPE.to_string(),
            num_labels: NUM_LABELS,
            id2label: BTreeMap::from([
                ("0".to_string(), "human".to_string()),
                ("1".to_string(), "ai".to_string()),
            ]),
            max_position_embeddings: max_length,
            vocab_size,
        }
    }
}

/// A loaded raw model.
#[derive(Debug, Clone)]
pub struct RawModel {
    pub config: ModelConfig,
    pub special_tokens: SpecialTokensMap,
    pub tokenizer: WordPieceTokenizer,
    pub weights: WeightsFile,
}

impl RawModel {
    pub fn load(dir: &Path) -> ModelResult<Self> {
        let layout = ModelLayout::new(dir.to_path_buf());
        for required in [layout.config_path(), layout.vocab_path(), layout.weights_path()] {
            if !required.is_file() {
                return Err(ModelError::Artifact(format!("missing {}", required.display())));
            }
        }

        let config: ModelConfig = read_json(&layout.config_path())?;
        if config.num_labels != NUM_LABELS {
            return Err(ModelError::InvalidConfig(format!(
                "expected {NUM_LABELS} labels, config declares {}",
                config.num_labels
            )));
        }
        let special_tokens = if layout.special_tokens_path().is_file() {
            read_json(&layout.special_tokens_path())?
        } else {
            SpecialTokensMap::default()
        };
        let tokenizer = WordPieceTokenizer::from_vocab_file(
            &layout.vocab_path(),
            &special_tokens,
            config.max_position_embeddings,
        )?;
        let weights = WeightsFile::load(&layout.weights_path())?;

        Ok(Self { config, special_tokens, tokenizer, weights })
    }

    pub fn classifier(&self) -> ModelResult<LinearClassifier> {
        LinearClassifier::from_tensors(&self.weights.tensors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Weights,
    Tokenizer,
    Config,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ArtifactKind,
    /// Relative to the model directory.
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub test_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub created_at: DateTime<Utc>,
    pub model_type: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    pub train_samples: usize,
    #[serde(default)]
    pub metrics: Option<TrainingMetrics>,
    pub artifacts: Vec<ModelArtifact>,
}

impl TrainingManifest {
    /// Re-hash every listed artifact and compare.
    pub fn verify(&self, dir: &Path) -> ModelResult<()> {
        for artifact in &self.artifacts {
            let actual = sha256_file(&dir.join(&artifact.path))?;
            if actual != artifact.sha256 {
                return Err(ModelError::Artifact(format!(
                    "checksum mismatch for {}",
                    artifact.path.display()
                )));
            }
        }
        Ok(())
    }
}

pub fn sha256_file(path: &Path) -> ModelResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub fn make_artifact(kind: ArtifactKind, dir: &Path, file_name: &str) -> ModelResult<ModelArtifact> {
    let path = dir.join(file_name);
    if !path.exists() {
        return Err(ModelError::Artifact(format!("artifact path does not exist: {}", path.display())));
    }
    Ok(ModelArtifact { kind, path: PathBuf::from(file_name), sha256: sha256_file(&path)? })
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ModelResult<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> ModelResult<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_file_known_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_verify_detects_tampering() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.json"), "{}").unwrap();
        let manifest = TrainingManifest {
            created_at: Utc::now(),
            model_type: MODEL_TYPE.to_string(),
            dataset_id: None,
            train_samples: 0,
            metrics: None,
            artifacts: vec![make_artifact(ArtifactKind::Config, temp.path(), "config.json").unwrap()],
        };
        manifest.verify(temp.path()).unwrap();

        std::fs::write(temp.path().join("config.json"), "{\"x\": 1}").unwrap();
        assert!(manifest.verify(temp.path()).is_err());
    }

    #[test]
    fn test_load_reports_missing_files() {
        let temp = TempDir::new().unwrap();
        let err = RawModel::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }
}
