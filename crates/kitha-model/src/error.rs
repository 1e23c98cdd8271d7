use kitha_dataset::DatasetError;
use thiserror::Error;

pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("tensor '{name}' has {actual} values, shape {shape:?} needs {expected}")]
    Shape { name: String, shape: Vec<usize>, expected: usize, actual: usize },

    #[error("tensor '{0}' is missing")]
    MissingTensor(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
