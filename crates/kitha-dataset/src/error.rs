use thiserror::Error;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("source '{source_id}' returned an unexpected schema: {details}")]
    Schema { source_id: String, details: String },

    #[error("invalid label map for source '{source_id}': {reason}")]
    InvalidLabelMap { source_id: String, reason: String },

    #[error("no records survived assembly; nothing to persist")]
    EmptyDataset,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl DatasetError {
    pub(crate) fn unavailable(source_id: &str, reason: impl ToString) -> Self {
        Self::SourceUnavailable { source_id: source_id.to_string(), reason: reason.to_string() }
    }

    pub(crate) fn schema(source_id: &str, details: impl ToString) -> Self {
        Self::Schema { source_id: source_id.to_string(), details: details.to_string() }
    }
}
