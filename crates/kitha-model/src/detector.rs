//! Tokenizer + classifier pair with a probability API.

use crate::artifact::RawModel;
use crate::bundle::{read_bundle, TOKENIZER_CONFIG_JSON, VOCAB_JSON};
use crate::classifier::{softmax, Classifier, LinearClassifier};
use crate::error::{ModelError, ModelResult};
use crate::tokenizer::{Tokenizer, WordPieceTokenizer};
use std::path::Path;

/// Class probabilities for one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub human: f32,
    pub ai: f32,
}

pub struct Detector {
    tokenizer: Box<dyn Tokenizer>,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("vocab_size", &self.tokenizer.vocab_size())
            .field("max_length", &self.tokenizer.max_length())
            .finish_non_exhaustive()
    }
}

impl Detector {
    #[must_use]
    pub fn new(tokenizer: Box<dyn Tokenizer>, classifier: Box<dyn Classifier>) -> Self {
        Self { tokenizer, classifier }
    }

    /// Load from an export bundle directory.
    pub fn from_bundle(dir: &Path) -> ModelResult<Self> {
        let (_manifest, tensors) = read_bundle(dir)?;
        let classifier = LinearClassifier::from_tensors(&tensors)?;
        let tokenizer = WordPieceTokenizer::from_bundle_files(&dir.join(VOCAB_JSON), &dir.join(TOKENIZER_CONFIG_JSON))?;
        Self::checked(tokenizer, classifier)
    }

    /// Load straight from a raw model directory.
    pub fn from_raw(dir: &Path) -> ModelResult<Self> {
        let raw = RawModel::load(dir)?;
        let classifier = raw.classifier()?;
        Self::checked(raw.tokenizer, classifier)
    }

    fn checked(tokenizer: WordPieceTokenizer, classifier: LinearClassifier) -> ModelResult<Self> {
        if tokenizer.vocab_size() > classifier.vocab_size() {
            return Err(ModelError::InvalidConfig(format!(
                "tokenizer has {} tokens but classifier only {} rows",
                tokenizer.vocab_size(),
                classifier.vocab_size()
            )));
        }
        Ok(Self::new(Box::new(tokenizer), Box::new(classifier)))
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.tokenizer.max_length()
    }

    pub fn predict(&self, text: &str) -> ModelResult<Probabilities> {
        let encoding = self.tokenizer.encode(text);
        let [human, ai] = softmax(self.classifier.logits(&encoding)?);
        Ok(Probabilities { human, ai })
    }
}
