use crate::config::ServeConfig;
use crate::error::{PredictError, ServeError, ServeResult};
use crate::resolve::{resolve, ModelSource};
use kitha_model::Detector;
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const MAX_TEXT_CHARS: usize = 1000;
pub const DEVICE: &str = "cpu";

const WARM_UP_TEXT: &str = "Test text for warmup";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub ai_prob: f64,
    pub human_prob: f64,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// The loaded model and tokenizer, shared read-only by every request.
pub struct ModelContext {
    detector: Detector,
    source: ModelSource,
}

impl ModelContext {
    /// Resolve, load and warm up the configured model.
    pub async fn load(config: &ServeConfig) -> ServeResult<Self> {
        let source = resolve(config).await?;
        Self::from_source(source)
    }

    pub fn from_dir(dir: &Path) -> ServeResult<Self> {
        Self::from_source(ModelSource::Local(dir.to_path_buf()))
    }

    fn from_source(source: ModelSource) -> ServeResult<Self> {
        let detector = Detector::from_bundle(source.dir())?;
        let context = Self { detector, source };

        let warm = context.predict(WARM_UP_TEXT).map_err(|e| ServeError::WarmUp(e.to_string()))?;
        info!(ai_prob = warm.ai_prob, human_prob = warm.human_prob, "Warm-up complete");
        Ok(context)
    }

    #[must_use]
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Score one text. Input is trimmed; it must be non-empty and at most
    /// [`MAX_TEXT_CHARS`] characters.
    pub fn predict(&self, text: &str) -> Result<Prediction, PredictError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PredictError::EmptyText);
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(PredictError::TextTooLong);
        }

        let probs = self.detector.predict(text).map_err(PredictError::Inference)?;
        let ai_prob = round4(f64::from(probs.ai));
        Ok(Prediction { ai_prob, human_prob: round4(1.0 - ai_prob) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert!((round4(0.123_456) - 0.1235).abs() < 1e-12);
        assert!((round4(0.5) - 0.5).abs() < f64::EPSILON);
        assert!((round4(0.0) - 0.0).abs() < f64::EPSILON);
    }
}
