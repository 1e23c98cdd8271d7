use crate::error::{ExportError, ExportResult};
use kitha_model::bundle::{MODEL_JSON, TOKENIZER_CONFIG_JSON, VOCAB_JSON};
use std::path::Path;

const SHARD_PATTERN: &str = "group*.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleCheck {
    pub format: String,
    pub shard_count: usize,
}

fn missing(what: impl Into<String>) -> ExportError {
    ExportError::Verification { missing: what.into() }
}

/// Check a bundle directory is complete enough to serve.
pub fn verify_bundle(dir: &Path) -> ExportResult<BundleCheck> {
    let model_json = dir.join(MODEL_JSON);
    if !model_json.is_file() {
        return Err(missing(MODEL_JSON));
    }

    let pattern = dir.join(SHARD_PATTERN);
    let shard_count = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| missing(format!("{SHARD_PATTERN} ({e})")))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .count();
    if shard_count == 0 {
        return Err(missing(SHARD_PATTERN));
    }

    let manifest: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&model_json)?)?;
    let format = match manifest.get("format").and_then(serde_json::Value::as_str) {
        Some(f) if !f.is_empty() => f.to_string(),
        _ => return Err(missing(format!("{MODEL_JSON} format field"))),
    };

    for file in [VOCAB_JSON, TOKENIZER_CONFIG_JSON] {
        if !dir.join(file).is_file() {
            return Err(missing(file));
        }
    }

    Ok(BundleCheck { format, shard_count })
}
