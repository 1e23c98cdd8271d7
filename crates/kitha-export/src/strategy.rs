//! Routes from a raw model directory to the serving intermediate
//! (`saved_model/`), tried in order until one succeeds.

use crate::error::{ExportError, ExportResult};
use kitha_model::tensor::{BIAS_TENSOR, WEIGHT_TENSOR};
use kitha_model::{RawModel, Tensor, WeightsFile};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INTERCHANGE_FILE: &str = "model.onnx";
pub const SAVED_MODEL_DIR: &str = "saved_model";
pub const SAVED_MODEL_FILE: &str = "saved_model.json";
pub const VARIABLES_FILE: &str = "variables.json";
pub const SIGNATURE_NAME: &str = "serving_default";
pub const SERVE_TAG: &str = "serve";
pub const OPSET_VERSION: u32 = 14;

const BATCH_AXIS: &str = "batch_size";

pub trait ConversionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Produce `work_dir/saved_model` from the raw model in `raw_dir` and
    /// return its path.
    fn convert(&self, raw_dir: &Path, work_dir: &Path) -> ExportResult<PathBuf>;
}

/// One named input or output of the serving signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: String,
    /// `None` marks a dynamic axis.
    pub shape: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl Signature {
    fn for_sequence_length(max_length: usize, num_labels: usize) -> Self {
        let input = |name: &str| TensorSpec { name: name.to_string(), dtype: "int64".to_string(), shape: vec![None, Some(max_length)] };
        Self {
            inputs: vec![input("input_ids"), input("attention_mask")],
            outputs: vec![TensorSpec {
                name: "logits".to_string(),
                dtype: "float32".to_string(),
                shape: vec![None, Some(num_labels)],
            }],
        }
    }
}

/// `saved_model/saved_model.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedModelMeta {
    pub tags: Vec<String>,
    pub signature_name: String,
    pub signature: Signature,
    /// Route that produced this directory.
    pub derived_from: String,
}

/// A serving intermediate on disk.
#[derive(Debug, Clone)]
pub struct SavedModel {
    pub meta: SavedModelMeta,
    pub tensors: Vec<Tensor>,
}

impl SavedModel {
    pub fn load(dir: &Path) -> ExportResult<Self> {
        let meta_path = dir.join(SAVED_MODEL_FILE);
        let meta: SavedModelMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?;
        let variables = WeightsFile::load(&dir.join("variables").join(VARIABLES_FILE))?;
        Ok(Self { meta, tensors: variables.tensors })
    }

    fn write(&self, dir: &Path) -> ExportResult<()> {
        let variables_dir = dir.join("variables");
        std::fs::create_dir_all(&variables_dir)?;
        std::fs::write(dir.join(SAVED_MODEL_FILE), serde_json::to_string_pretty(&self.meta)?)?;
        WeightsFile { tensors: self.tensors.clone() }.save(&variables_dir.join(VARIABLES_FILE))?;
        Ok(())
    }
}

fn saved_model(tensors: Vec<Tensor>, max_length: usize, num_labels: usize, route: &str) -> SavedModel {
    SavedModel {
        meta: SavedModelMeta {
            tags: vec![SERVE_TAG.to_string()],
            signature_name: SIGNATURE_NAME.to_string(),
            signature: Signature::for_sequence_length(max_length, num_labels),
            derived_from: route.to_string(),
        },
        tensors,
    }
}

fn conversion_error(route: &str, reason: impl ToString) -> ExportError {
    ExportError::Conversion { route: route.to_string(), reason: reason.to_string() }
}

/// Writes `model.onnx` first, then builds `saved_model/` from that file alone.
#[derive(Debug, Default, Clone)]
pub struct InterchangeRoute;

impl InterchangeRoute {
    pub const NAME: &'static str = "interchange";

    fn write_graph(raw: &RawModel, path: &Path) -> ExportResult<()> {
        let tensors = raw.classifier()?.to_tensors()?;
        let max_length = raw.config.max_position_embeddings;
        let initializers: Vec<_> = tensors
            .iter()
            .map(|t| json!({ "name": t.name, "dims": t.shape, "data_type": "float32", "float_data": t.data }))
            .collect();

        let graph = json!({
            "ir_version": 8,
            "producer_name": concat!("kitha-export ", env!("CARGO_PKG_VERSION")),
            "opset_import": [{ "domain": "", "version": OPSET_VERSION }],
            "graph": {
                "name": raw.config.model_type,
                "input": [
                    { "name": "input_ids", "elem_type": "int64", "shape": [BATCH_AXIS, max_length] },
                    { "name": "attention_mask", "elem_type": "int64", "shape": [BATCH_AXIS, max_length] },
                ],
                "output": [
                    { "name": "logits", "elem_type": "float32", "shape": [BATCH_AXIS, raw.config.num_labels] },
                ],
                "node": [
                    { "op_type": "Gather", "input": [WEIGHT_TENSOR, "input_ids"], "output": ["token_logits"] },
                    { "op_type": "Mul", "input": ["token_logits", "attention_mask"], "output": ["masked"] },
                    { "op_type": "ReduceSum", "input": ["masked"], "output": ["summed"], "attribute": { "axes": [1] } },
                    { "op_type": "Add", "input": ["summed", BIAS_TENSOR], "output": ["logits"] },
                ],
                "initializer": initializers,
            },
            "dynamic_axes": {
                "input_ids": { "0": BATCH_AXIS },
                "attention_mask": { "0": BATCH_AXIS },
                "logits": { "0": BATCH_AXIS },
            },
        });
        std::fs::write(path, serde_json::to_string(&graph)?)?;
        Ok(())
    }

    fn read_graph(path: &Path) -> ExportResult<SavedModel> {
        let graph: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let route = Self::NAME;

        let max_length = graph["graph"]["input"][0]["shape"][1]
            .as_u64()
            .ok_or_else(|| conversion_error(route, "graph input has no sequence length"))?;
        let num_labels = graph["graph"]["output"][0]["shape"][1]
            .as_u64()
            .ok_or_else(|| conversion_error(route, "graph output has no label axis"))?;
        let initializers = graph["graph"]["initializer"]
            .as_array()
            .ok_or_else(|| conversion_error(route, "graph has no initializers"))?;

        let mut tensors = Vec::with_capacity(initializers.len());
        for init in initializers {
            let name = init["name"].as_str().ok_or_else(|| conversion_error(route, "unnamed initializer"))?;
            let dims: Vec<usize> = serde_json::from_value(init["dims"].clone())?;
            let data: Vec<f32> = serde_json::from_value(init["float_data"].clone())?;
            tensors.push(Tensor::new(name, dims, data)?);
        }

        Ok(saved_model(tensors, max_length as usize, num_labels as usize, route))
    }
}

impl ConversionStrategy for InterchangeRoute {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn convert(&self, raw_dir: &Path, work_dir: &Path) -> ExportResult<PathBuf> {
        let raw = RawModel::load(raw_dir).map_err(|e| conversion_error(Self::NAME, e))?;
        let graph_path = work_dir.join(INTERCHANGE_FILE);
        Self::write_graph(&raw, &graph_path)?;
        debug!(path = %graph_path.display(), opset = OPSET_VERSION, "Wrote interchange graph");

        let model = Self::read_graph(&graph_path)?;
        let out = work_dir.join(SAVED_MODEL_DIR);
        model.write(&out)?;
        info!(route = Self::NAME, path = %out.display(), "Serving intermediate ready");
        Ok(out)
    }
}

/// Builds `saved_model/` straight from the trained weights.
#[derive(Debug, Default, Clone)]
pub struct DirectRoute;

impl DirectRoute {
    pub const NAME: &'static str = "direct";
}

impl ConversionStrategy for DirectRoute {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn convert(&self, raw_dir: &Path, work_dir: &Path) -> ExportResult<PathBuf> {
        let raw = RawModel::load(raw_dir).map_err(|e| conversion_error(Self::NAME, e))?;
        let tensors = raw.classifier()?.to_tensors()?;
        let model = saved_model(tensors, raw.config.max_position_embeddings, raw.config.num_labels, Self::NAME);

        let out = work_dir.join(SAVED_MODEL_DIR);
        model.write(&out)?;
        info!(route = Self::NAME, path = %out.display(), "Serving intermediate ready");
        Ok(out)
    }
}

/// Strategy list in the order the pipeline tries them.
#[must_use]
pub fn default_strategies(skip_interchange: bool) -> Vec<Box<dyn ConversionStrategy>> {
    if skip_interchange {
        vec![Box::new(DirectRoute)]
    } else {
        vec![Box::new(InterchangeRoute), Box::new(DirectRoute)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_raw_model;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_interchange_graph_declares_opset_and_dynamic_batch() {
        let raw = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_raw_model(raw.path());

        InterchangeRoute.convert(raw.path(), work.path()).unwrap();

        let graph: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(work.path().join(INTERCHANGE_FILE)).unwrap()).unwrap();
        assert_eq!(graph["opset_import"][0]["version"], 14);
        assert_eq!(graph["dynamic_axes"]["logits"]["0"], "batch_size");
        assert_eq!(graph["graph"]["input"][0]["shape"][0], "batch_size");
    }

    #[test]
    fn test_both_routes_yield_same_tensors() {
        let raw = TempDir::new().unwrap();
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let via_graph = SavedModel::load(&InterchangeRoute.convert(raw.path(), a.path()).unwrap()).unwrap();
        let direct = SavedModel::load(&DirectRoute.convert(raw.path(), b.path()).unwrap()).unwrap();

        assert_eq!(via_graph.tensors, direct.tensors);
        assert_eq!(via_graph.meta.signature, direct.meta.signature);
        assert_eq!(via_graph.meta.signature_name, "serving_default");
        assert_eq!(direct.meta.tags, vec!["serve".to_string()]);
        assert_eq!(direct.meta.derived_from, "direct");
    }

    #[test]
    fn test_missing_raw_model_is_conversion_failure() {
        let raw = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let err = DirectRoute.convert(raw.path(), work.path()).unwrap_err();
        assert!(matches!(err, ExportError::Conversion { ref route, .. } if route == "direct"));
    }

    #[test]
    fn test_skip_interchange_leaves_only_direct() {
        let names: Vec<String> = default_strategies(true).iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["direct"]);
        assert_eq!(default_strategies(false).len(), 2);
    }
}
