use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const WEIGHT_TENSOR: &str = "classifier.weight";
pub const BIAS_TENSOR: &str = "classifier.bias";

/// A named dense f32 tensor, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(name: &str, shape: Vec<usize>, data: Vec<f32>) -> ModelResult<Self> {
        let tensor = Self { name: name.to_string(), shape, data };
        tensor.validate()?;
        Ok(tensor)
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn validate(&self) -> ModelResult<()> {
        let expected = self.element_count();
        if expected != self.data.len() {
            return Err(ModelError::Shape {
                name: self.name.clone(),
                shape: self.shape.clone(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// `model_weights.json`: every trained tensor of a raw model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightsFile {
    pub tensors: Vec<Tensor>,
}

impl WeightsFile {
    pub fn load(path: &Path) -> ModelResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ModelError::Artifact(format!("failed to read weights {}: {e}", path.display())))?;
        let file: Self = serde_json::from_slice(&bytes)?;
        for tensor in &file.tensors {
            tensor.validate()?;
        }
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> ModelResult<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> ModelResult<&Tensor> {
        self.tensors
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ModelError::MissingTensor(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let err = Tensor::new("w", vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(err.to_string().contains("needs 6"));
    }

    #[test]
    fn test_weights_file_lookup_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("model_weights.json");
        let file = WeightsFile {
            tensors: vec![Tensor::new(BIAS_TENSOR, vec![2], vec![0.5, -0.5]).unwrap()],
        };
        file.save(&path).unwrap();

        let loaded = WeightsFile::load(&path).unwrap();
        assert_eq!(loaded.get(BIAS_TENSOR).unwrap().data, vec![0.5, -0.5]);
        assert!(matches!(loaded.get(WEIGHT_TENSOR), Err(ModelError::MissingTensor(_))));
    }
}
