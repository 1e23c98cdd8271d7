use kitha_model::{ModelConfig, Tensor, WeightsFile};
use std::path::Path;

pub(crate) const VOCAB: [&str; 6] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "hello", "world"];

/// A six-token raw model where "hello" leans human and "world" leans AI.
pub(crate) fn write_raw_model(dir: &Path) {
    let config = ModelConfig::new(VOCAB.len(), 16);
    std::fs::write(dir.join("config.json"), serde_json::to_string(&config).unwrap()).unwrap();
    std::fs::write(dir.join("vocab.txt"), VOCAB.join("\n")).unwrap();
    let weights = WeightsFile {
        tensors: vec![
            Tensor::new(
                "classifier.weight",
                vec![6, 2],
                vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0, -0.5, 0.5],
            )
            .unwrap(),
            Tensor::new("classifier.bias", vec![2], vec![0.1, -0.1]).unwrap(),
        ],
    };
    weights.save(&dir.join("model_weights.json")).unwrap();
}
