use crate::stage::ExportStage;
use kitha_model::ModelError;
use thiserror::Error;

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    /// One conversion route failed; the next one is tried.
    #[error("conversion route '{route}' failed: {reason}")]
    Conversion { route: String, reason: String },

    #[error("every conversion route failed: {}", summarize(.failures))]
    FallbackExhausted { failures: Vec<(String, String)> },

    #[error("'{program}' exited with {}: {stderr}", .status.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    ExternalTool { program: String, status: Option<i32>, stderr: String },

    #[error("bundle verification failed: {missing}")]
    Verification { missing: String },

    /// A fatal error, tagged with the stage the pipeline was trying to reach.
    #[error("export failed before {stage}: {source}")]
    Stage {
        stage: ExportStage,
        #[source]
        source: Box<ExportError>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    pub(crate) fn at(self, stage: ExportStage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage { stage, source: Box::new(other) },
        }
    }

    /// The stage a fatal error stopped in front of, if tagged.
    #[must_use]
    pub fn stage(&self) -> Option<ExportStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error without the stage tag.
    #[must_use]
    pub fn cause(&self) -> &ExportError {
        match self {
            Self::Stage { source, .. } => source.cause(),
            other => other,
        }
    }
}

fn summarize(failures: &[(String, String)]) -> String {
    failures.iter().map(|(route, reason)| format!("{route}: {reason}")).collect::<Vec<_>>().join("; ")
}
