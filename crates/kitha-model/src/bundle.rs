//! Export bundle format: a `model.json` manifest plus little-endian f32
//! weight shards, laid out like a TensorFlow.js graph model.

use crate::artifact::{read_json, write_json};
use crate::error::{ModelError, ModelResult};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

pub const MODEL_JSON: &str = "model.json";
pub const VOCAB_JSON: &str = "vocab.json";
pub const TOKENIZER_CONFIG_JSON: &str = "tokenizer_config.json";
pub const GRAPH_MODEL_FORMAT: &str = "graph-model";
pub const MAX_SHARD_BYTES: usize = 4 * 1024 * 1024;

const FLOAT32: &str = "float32";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightGroup {
    pub paths: Vec<String>,
    pub weights: Vec<WeightSpec>,
}

/// `model.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub format: String,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub converted_by: Option<String>,
    #[serde(default)]
    pub model_topology: serde_json::Value,
    pub weights_manifest: Vec<WeightGroup>,
}

impl BundleManifest {
    pub fn load(dir: &Path) -> ModelResult<Self> {
        let path = dir.join(MODEL_JSON);
        if !path.is_file() {
            return Err(ModelError::Artifact(format!("missing {}", path.display())));
        }
        read_json(&path)
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.weights_manifest.iter().map(|g| g.paths.len()).sum()
    }

    /// Every shard path, each checked with [`check_shard_path`].
    pub fn shard_paths(&self) -> ModelResult<Vec<&str>> {
        self.weights_manifest
            .iter()
            .flat_map(|g| g.paths.iter())
            .map(|path| check_shard_path(path).map(|()| path.as_str()))
            .collect()
    }
}

/// A shard path must be a single plain file name inside the bundle.
pub fn check_shard_path(path: &str) -> ModelResult<()> {
    let mut components = Path::new(path).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ModelError::Artifact(format!("shard path '{path}' is not a file name inside the bundle"))),
    }
}

#[must_use]
pub fn shard_name(index: usize, count: usize) -> String {
    format!("group1-shard{index}of{count}.bin")
}

/// Write `tensors` as one weight group split into shards of at most
/// `max_shard_bytes`, then `model.json` describing them.
pub fn write_bundle(
    dir: &Path,
    tensors: &[Tensor],
    max_shard_bytes: usize,
    model_topology: serde_json::Value,
    converted_by: &str,
) -> ModelResult<BundleManifest> {
    if max_shard_bytes < 4 {
        return Err(ModelError::InvalidConfig("shard size must hold at least one f32".to_string()));
    }
    std::fs::create_dir_all(dir)?;

    let mut bytes = Vec::with_capacity(tensors.iter().map(|t| t.data.len() * 4).sum());
    let mut weights = Vec::with_capacity(tensors.len());
    for tensor in tensors {
        tensor.validate()?;
        for value in &tensor.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        weights.push(WeightSpec { name: tensor.name.clone(), shape: tensor.shape.clone(), dtype: FLOAT32.to_string() });
    }

    let chunks: Vec<&[u8]> =
        if bytes.is_empty() { vec![&bytes[..]] } else { bytes.chunks(max_shard_bytes).collect() };
    let count = chunks.len();
    let mut paths = Vec::with_capacity(count);
    for (i, chunk) in chunks.into_iter().enumerate() {
        let name = shard_name(i + 1, count);
        std::fs::write(dir.join(&name), chunk)?;
        paths.push(name);
    }

    let manifest = BundleManifest {
        format: GRAPH_MODEL_FORMAT.to_string(),
        generated_by: Some(concat!("kitha-model ", env!("CARGO_PKG_VERSION")).to_string()),
        converted_by: Some(converted_by.to_string()),
        model_topology,
        weights_manifest: vec![WeightGroup { paths, weights }],
    };
    write_json(&dir.join(MODEL_JSON), &manifest)?;
    Ok(manifest)
}

/// Read every tensor declared in a bundle's `model.json`.
pub fn read_bundle(dir: &Path) -> ModelResult<(BundleManifest, Vec<Tensor>)> {
    let manifest = BundleManifest::load(dir)?;
    let mut tensors = Vec::new();

    for group in &manifest.weights_manifest {
        let mut bytes = Vec::new();
        for path in &group.paths {
            check_shard_path(path)?;
            let shard = dir.join(path);
            let data = std::fs::read(&shard)
                .map_err(|e| ModelError::Artifact(format!("failed to read shard {}: {e}", shard.display())))?;
            bytes.extend(data);
        }

        let mut offset = 0;
        for spec in &group.weights {
            if spec.dtype != FLOAT32 {
                return Err(ModelError::Artifact(format!(
                    "weight '{}' has unsupported dtype {}",
                    spec.name, spec.dtype
                )));
            }
            let len = spec.shape.iter().product::<usize>() * 4;
            let slice = bytes.get(offset..offset + len).ok_or_else(|| {
                ModelError::Artifact(format!("shards end before weight '{}' is complete", spec.name))
            })?;
            let data = slice
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            tensors.push(Tensor::new(&spec.name, spec.shape.clone(), data)?);
            offset += len;
        }
        if offset != bytes.len() {
            return Err(ModelError::Artifact(format!(
                "{} trailing bytes after the declared weights",
                bytes.len() - offset
            )));
        }
    }

    Ok((manifest, tensors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn tensors() -> Vec<Tensor> {
        vec![
            Tensor::new("classifier.weight", vec![3, 2], vec![0.1, -0.2, 0.3, -0.4, 0.5, -0.6]).unwrap(),
            Tensor::new("classifier.bias", vec![2], vec![1.5, -1.5]).unwrap(),
        ]
    }

    #[test]
    fn test_small_shard_limit_splits_across_files() {
        let temp = TempDir::new().unwrap();
        let manifest = write_bundle(temp.path(), &tensors(), 12, json!({}), "test").unwrap();

        // 8 floats = 32 bytes -> 12 + 12 + 8
        assert_eq!(manifest.shard_count(), 3);
        assert!(temp.path().join("group1-shard1of3.bin").is_file());
        assert!(temp.path().join("group1-shard3of3.bin").is_file());
        assert_eq!(manifest.format, GRAPH_MODEL_FORMAT);

        let (_, read) = read_bundle(temp.path()).unwrap();
        assert_eq!(read, tensors());
    }

    #[test]
    fn test_model_json_uses_camel_case_keys() {
        let temp = TempDir::new().unwrap();
        write_bundle(temp.path(), &tensors(), MAX_SHARD_BYTES, json!({}), "test").unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(temp.path().join(MODEL_JSON)).unwrap()).unwrap();
        assert_eq!(raw["format"], "graph-model");
        assert_eq!(raw["weightsManifest"][0]["paths"][0], "group1-shard1of1.bin");
        assert_eq!(raw["weightsManifest"][0]["weights"][1]["dtype"], "float32");
    }

    #[test]
    fn test_truncated_shard_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_bundle(temp.path(), &tensors(), MAX_SHARD_BYTES, json!({}), "test").unwrap();
        std::fs::write(temp.path().join("group1-shard1of1.bin"), [0u8; 10]).unwrap();
        assert!(read_bundle(temp.path()).is_err());
    }

    #[test]
    fn test_shard_paths_must_stay_inside_bundle() {
        assert!(check_shard_path("group1-shard1of1.bin").is_ok());
        for bad in ["../escaped.bin", "/tmp/escaped.bin", "nested/shard.bin", "..", ""] {
            assert!(check_shard_path(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_traversal_in_local_manifest_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut manifest = write_bundle(temp.path(), &tensors(), MAX_SHARD_BYTES, json!({}), "test").unwrap();
        manifest.weights_manifest[0].paths = vec!["../group1-shard1of1.bin".to_string()];
        write_json(&temp.path().join(MODEL_JSON), &manifest).unwrap();

        assert!(matches!(read_bundle(temp.path()), Err(ModelError::Artifact(_))));
        assert!(manifest.shard_paths().is_err());
    }
}
