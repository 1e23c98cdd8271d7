//! Bag-of-tokens linear classifier.
//!
//! `logits = bias + Σ weight[token]` over the attended positions. The
//! forward pass is a pure function of the weights and the encoding.

use crate::error::{ModelError, ModelResult};
use crate::tensor::{Tensor, BIAS_TENSOR, WEIGHT_TENSOR};
use crate::tokenizer::Encoding;

pub const NUM_LABELS: usize = 2;

/// Anything that maps an encoding to human/AI logits.
pub trait Classifier: Send + Sync {
    fn logits(&self, encoding: &Encoding) -> ModelResult<[f32; NUM_LABELS]>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    /// `[vocab, 2]`, row-major.
    weight: Vec<f32>,
    bias: [f32; NUM_LABELS],
    vocab_size: usize,
}

impl LinearClassifier {
    pub fn new(weight: Vec<f32>, bias: [f32; NUM_LABELS]) -> ModelResult<Self> {
        if weight.len() % NUM_LABELS != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "weight length {} is not a multiple of {NUM_LABELS}",
                weight.len()
            )));
        }
        let vocab_size = weight.len() / NUM_LABELS;
        Ok(Self { weight, bias, vocab_size })
    }

    /// Build from `classifier.weight` `[vocab, 2]` and `classifier.bias` `[2]`.
    pub fn from_tensors(tensors: &[Tensor]) -> ModelResult<Self> {
        let find = |name: &str| {
            tensors
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| ModelError::MissingTensor(name.to_string()))
        };
        let weight = find(WEIGHT_TENSOR)?;
        let bias = find(BIAS_TENSOR)?;
        weight.validate()?;
        bias.validate()?;

        if weight.shape.len() != 2 || weight.shape[1] != NUM_LABELS {
            return Err(ModelError::InvalidConfig(format!(
                "{WEIGHT_TENSOR} must be [vocab, {NUM_LABELS}], got {:?}",
                weight.shape
            )));
        }
        let bias: [f32; NUM_LABELS] = bias.data.as_slice().try_into().map_err(|_| {
            ModelError::InvalidConfig(format!("{BIAS_TENSOR} must be [{NUM_LABELS}], got {:?}", bias.shape))
        })?;
        Self::new(weight.data.clone(), bias)
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// The tensors this classifier is built from, in bundle order.
    pub fn to_tensors(&self) -> ModelResult<Vec<Tensor>> {
        Ok(vec![
            Tensor::new(WEIGHT_TENSOR, vec![self.vocab_size, NUM_LABELS], self.weight.clone())?,
            Tensor::new(BIAS_TENSOR, vec![NUM_LABELS], self.bias.to_vec())?,
        ])
    }
}

impl Classifier for LinearClassifier {
    fn logits(&self, encoding: &Encoding) -> ModelResult<[f32; NUM_LABELS]> {
        let mut logits = self.bias;
        for id in encoding.attended() {
            let row = id as usize;
            if row >= self.vocab_size {
                return Err(ModelError::InvalidConfig(format!(
                    "token id {id} outside classifier vocabulary of {}",
                    self.vocab_size
                )));
            }
            let offset = row * NUM_LABELS;
            for (logit, w) in logits.iter_mut().zip(&self.weight[offset..offset + NUM_LABELS]) {
                *logit += *w;
            }
        }
        Ok(logits)
    }
}

/// Numerically stable softmax.
#[must_use]
pub fn softmax(logits: [f32; NUM_LABELS]) -> [f32; NUM_LABELS] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.map(|l| (l - max).exp());
    let sum: f32 = exp.iter().sum();
    exp.map(|e| e / sum)
}
