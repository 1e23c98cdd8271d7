//! Kitha Model
//!
//! The baseline detector family:
//! - WordPiece tokenization to fixed-length `[CLS] … [SEP]` sequences
//! - A bag-of-tokens linear classifier over named f32 tensors
//! - Raw model directories (`RawModel`) and sharded export bundles
//! - A naive Bayes trainer that writes raw models from an assembled dataset

pub mod artifact;
pub mod bundle;
pub mod classifier;
pub mod detector;
pub mod error;
pub mod tensor;
pub mod tokenizer;
pub mod trainer;

pub use artifact::{
    sha256_file, ArtifactKind, ModelArtifact, ModelConfig, ModelLayout, RawModel, TrainingManifest,
    TrainingMetrics,
};
pub use bundle::{read_bundle, write_bundle, BundleManifest, GRAPH_MODEL_FORMAT, MAX_SHARD_BYTES};
pub use classifier::{softmax, Classifier, LinearClassifier};
pub use detector::{Detector, Probabilities};
pub use error::{ModelError, ModelResult};
pub use tensor::{Tensor, WeightsFile};
pub use tokenizer::{Encoding, SpecialTokensMap, Tokenizer, TokenizerConfig, WordPieceTokenizer};
pub use trainer::{BaselineTrainer, TrainConfig, TrainReport};
