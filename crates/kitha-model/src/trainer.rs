//! Baseline trainer: multinomial naive Bayes over WordPiece token counts.

use crate::artifact::{
    make_artifact, write_json, ArtifactKind, ModelConfig, ModelLayout, TrainingManifest, TrainingMetrics,
    MODEL_TYPE,
};
use crate::classifier::{Classifier, LinearClassifier, NUM_LABELS};
use crate::error::{ModelError, ModelResult};
use crate::tensor::WeightsFile;
use crate::tokenizer::{
    basic_tokenize, SpecialTokensMap, Tokenizer, WordPieceTokenizer, CLS_TOKEN, DEFAULT_MAX_LENGTH, PAD_TOKEN,
    SEP_TOKEN, UNK_TOKEN,
};
use kitha_dataset::{DatasetError, DatasetStore, Format, Label, SegmentedRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, UNK_TOKEN, CLS_TOKEN, SEP_TOKEN];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Vocabulary cap, special tokens included.
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_min_frequency")]
    pub min_frequency: usize,
    /// Additive smoothing.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_vocab_size() -> usize {
    30_000
}

fn default_min_frequency() -> usize {
    2
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            min_frequency: default_min_frequency(),
            alpha: default_alpha(),
            max_length: default_max_length(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.vocab_size < 8 {
            return Err(ModelError::InvalidConfig("vocab_size must be at least 8".to_string()));
        }
        if self.alpha.is_nan() || self.alpha <= 0.0 {
            return Err(ModelError::InvalidConfig("alpha must be positive".to_string()));
        }
        if self.max_length < 4 {
            return Err(ModelError::InvalidConfig("max_length must be at least 4".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub output_dir: PathBuf,
    pub vocab_size: usize,
    pub train_samples: usize,
    pub metrics: Option<TrainingMetrics>,
    pub manifest: TrainingManifest,
}

#[derive(Debug, Clone)]
pub struct BaselineTrainer {
    config: TrainConfig,
}

impl BaselineTrainer {
    pub fn new(config: TrainConfig) -> ModelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Train on `data_dir/train.json`, evaluate on `test.json` when present,
    /// and write a raw model directory.
    pub fn train(&self, data_dir: &Path, output_dir: &Path) -> ModelResult<TrainReport> {
        let store = DatasetStore::open(data_dir);
        let train = store.load("train", Format::Json)?;
        let test = match store.load("test", Format::Json) {
            Ok(test) => test,
            Err(DatasetError::NotFound(_)) => {
                warn!(dir = %data_dir.display(), "no test split; skipping evaluation");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let dataset_id = store.load_stats().ok().map(|s| s.dataset_id);
        info!(train = train.len(), test = test.len(), "loaded dataset");

        let tokenizer = self.build_vocab(&train)?;
        let classifier = self.fit(&tokenizer, &train)?;
        info!(vocab = tokenizer.vocab_size(), "fitted classifier");

        let metrics = if test.is_empty() { None } else { Some(evaluate(&tokenizer, &classifier, &test)?) };
        if let Some(m) = &metrics {
            info!(accuracy = m.accuracy, f1 = m.f1, samples = m.test_samples, "evaluated");
        }

        let manifest = self.write(output_dir, &tokenizer, &classifier, metrics.as_ref(), dataset_id, train.len())?;
        Ok(TrainReport {
            output_dir: output_dir.to_path_buf(),
            vocab_size: tokenizer.vocab_size(),
            train_samples: train.len(),
            metrics,
            manifest,
        })
    }

    /// Specials first, then tokens by descending frequency, ties lexicographic.
    fn build_vocab(&self, train: &[SegmentedRecord]) -> ModelResult<WordPieceTokenizer> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in train {
            for token in basic_tokenize(&record.text) {
                *counts.entry(token).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(token, n)| *n >= self.config.min_frequency && !SPECIAL_TOKENS.contains(&token.as_str()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut tokens: Vec<String> = SPECIAL_TOKENS.iter().map(|t| (*t).to_string()).collect();
        tokens.extend(ranked.into_iter().map(|(token, _)| token).take(self.config.vocab_size - SPECIAL_TOKENS.len()));
        WordPieceTokenizer::new(tokens, &SpecialTokensMap::default(), self.config.max_length)
    }

    fn fit(&self, tokenizer: &WordPieceTokenizer, train: &[SegmentedRecord]) -> ModelResult<LinearClassifier> {
        let vocab = tokenizer.vocab_size();
        let mut docs = [0usize; NUM_LABELS];
        let mut totals = [0f64; NUM_LABELS];
        let mut counts = vec![[0f64; NUM_LABELS]; vocab];

        for record in train {
            let class = record.label.index();
            docs[class] += 1;
            for id in tokenizer.encode(&record.text).attended() {
                if tokenizer.is_special(id) {
                    continue;
                }
                counts[id as usize][class] += 1.0;
                totals[class] += 1.0;
            }
        }
        if docs.contains(&0) {
            return Err(ModelError::Training("training split must contain both labels".to_string()));
        }

        let alpha = self.config.alpha;
        let n = docs.iter().sum::<usize>() as f64;
        let mut weight = vec![0f32; vocab * NUM_LABELS];
        for (id, row) in counts.iter().enumerate() {
            if tokenizer.is_special(id as u32) {
                continue;
            }
            for class in 0..NUM_LABELS {
                let p = (row[class] + alpha) / (totals[class] + alpha * vocab as f64);
                weight[id * NUM_LABELS + class] = p.ln() as f32;
            }
        }
        let bias = docs.map(|d| (d as f64 / n).ln() as f32);

        LinearClassifier::new(weight, bias)
    }

    fn write(
        &self,
        output_dir: &Path,
        tokenizer: &WordPieceTokenizer,
        classifier: &LinearClassifier,
        metrics: Option<&TrainingMetrics>,
        dataset_id: Option<String>,
        train_samples: usize,
    ) -> ModelResult<TrainingManifest> {
        let layout = ModelLayout::new(output_dir.to_path_buf());
        layout.ensure_dirs()?;

        write_json(&layout.config_path(), &ModelConfig::new(tokenizer.vocab_size(), self.config.max_length))?;
        let mut vocab = tokenizer.tokens().join("\n");
        vocab.push('\n');
        std::fs::write(layout.vocab_path(), vocab)?;
        write_json(&layout.special_tokens_path(), &SpecialTokensMap::default())?;
        WeightsFile { tensors: classifier.to_tensors()? }.save(&layout.weights_path())?;

        let dir = layout.root();
        let mut artifacts = vec![
            make_artifact(ArtifactKind::Config, dir, "config.json")?,
            make_artifact(ArtifactKind::Tokenizer, dir, "vocab.txt")?,
            make_artifact(ArtifactKind::Tokenizer, dir, "special_tokens_map.json")?,
            make_artifact(ArtifactKind::Weights, dir, "model_weights.json")?,
        ];
        if let Some(metrics) = metrics {
            write_json(&layout.metrics_path(), metrics)?;
            artifacts.push(make_artifact(ArtifactKind::Metrics, dir, "metrics.json")?);
        }

        let manifest = TrainingManifest {
            created_at: chrono::Utc::now(),
            model_type: MODEL_TYPE.to_string(),
            dataset_id,
            train_samples,
            metrics: metrics.cloned(),
            artifacts,
        };
        write_json(&layout.manifest_path(), &manifest)?;
        info!(dir = %dir.display(), "raw model written");
        Ok(manifest)
    }
}

/// Accuracy, precision, recall and F1 with AI as the positive class.
pub fn evaluate(
    tokenizer: &dyn Tokenizer,
    classifier: &dyn Classifier,
    records: &[SegmentedRecord],
) -> ModelResult<TrainingMetrics> {
    let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    for record in records {
        let [human, ai] = classifier.logits(&tokenizer.encode(&record.text))?;
        let predicted_ai = ai > human;
        match (predicted_ai, record.label) {
            (true, Label::Ai) => tp += 1,
            (true, Label::Human) => fp += 1,
            (false, Label::Human) => tn += 1,
            (false, Label::Ai) => fn_ += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };

    Ok(TrainingMetrics {
        accuracy: ratio(tp + tn, records.len()),
        precision,
        recall,
        f1,
        test_samples: records.len(),
    })
}
