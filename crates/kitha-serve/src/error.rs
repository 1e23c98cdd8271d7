use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kitha_model::ModelError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::context::MAX_TEXT_CHARS;

pub type ServeResult<T> = std::result::Result<T, ServeError>;

/// Startup failures. Any of these keeps the listener from binding.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("warm-up prediction failed: {0}")]
    WarmUp(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Per-request failures, rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Text is required")]
    EmptyText,

    #[error("Text too long (max {} chars)", MAX_TEXT_CHARS)]
    TextTooLong,

    #[error("Model not loaded")]
    NotLoaded,

    /// Body missing, not JSON, or without a string `text`.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Prediction failed")]
    Inference(#[source] ModelError),
}

impl PredictError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyText | Self::TextTooLong | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            Self::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for PredictError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        match &self {
            Self::Inference(cause) => error!(error = %cause, "Prediction failed"),
            other => debug!(reason = %other, "Prediction rejected"),
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
