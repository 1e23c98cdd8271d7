//! Train from a persisted dataset, then load the result both ways.

use kitha_dataset::{DatasetStore, Label, SegmentedRecord, Splits, TextType};
use kitha_model::bundle::{TOKENIZER_CONFIG_JSON, VOCAB_JSON};
use kitha_model::{
    write_bundle, BaselineTrainer, Detector, RawModel, TrainConfig, TrainingManifest, MAX_SHARD_BYTES,
};
use tempfile::TempDir;

fn seg(text: String, label: Label) -> SegmentedRecord {
    SegmentedRecord {
        text,
        label,
        source: "fixture".to_string(),
        category: "mixed".to_string(),
        text_type: TextType::OriginalShort,
    }
}

fn write_dataset(dir: &TempDir) {
    let mut train = Vec::new();
    for i in 0..40 {
        train.push(seg(format!("lol cant believe the bus was late again today {i}"), Label::Human));
        train.push(seg(format!("In conclusion, it is essential to consider multiple perspectives {i}"), Label::Ai));
    }
    let test = vec![
        seg("ugh the bus was late lol".to_string(), Label::Human),
        seg("It is essential to consider perspectives".to_string(), Label::Ai),
    ];
    DatasetStore::open(dir.path()).save_splits(&Splits { train, val: Vec::new(), test }).unwrap();
}

#[test]
fn test_train_writes_loadable_raw_model() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_dataset(&data);

    let trainer = BaselineTrainer::new(TrainConfig { min_frequency: 1, ..TrainConfig::default() }).unwrap();
    let report = trainer.train(data.path(), out.path()).unwrap();

    assert_eq!(report.train_samples, 80);
    let metrics = report.metrics.as_ref().unwrap();
    assert!((metrics.accuracy - 1.0).abs() < f64::EPSILON);
    assert!(report.manifest.dataset_id.is_some());

    for file in ["config.json", "vocab.txt", "special_tokens_map.json", "model_weights.json", "metrics.json"] {
        assert!(out.path().join(file).is_file(), "missing {file}");
    }
    let manifest: TrainingManifest =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("training_manifest.json")).unwrap()).unwrap();
    manifest.verify(out.path()).unwrap();

    let raw = RawModel::load(out.path()).unwrap();
    assert_eq!(raw.config.num_labels, 2);
    assert_eq!(raw.config.max_position_embeddings, 128);

    let detector = Detector::from_raw(out.path()).unwrap();
    let p = detector.predict("the bus was late lol").unwrap();
    assert!(p.human > p.ai);
    assert!((p.human + p.ai - 1.0).abs() < 1e-5);
}

#[test]
fn test_bundle_predictions_match_raw_model() {
    let data = TempDir::new().unwrap();
    let raw_dir = TempDir::new().unwrap();
    let bundle = TempDir::new().unwrap();
    write_dataset(&data);
    BaselineTrainer::new(TrainConfig { min_frequency: 1, ..TrainConfig::default() })
        .unwrap()
        .train(data.path(), raw_dir.path())
        .unwrap();

    let raw = RawModel::load(raw_dir.path()).unwrap();
    let tensors = raw.classifier().unwrap().to_tensors().unwrap();
    write_bundle(bundle.path(), &tensors, MAX_SHARD_BYTES, serde_json::json!({}), "test").unwrap();
    std::fs::write(
        bundle.path().join(VOCAB_JSON),
        serde_json::to_string(&raw.tokenizer.vocab_map()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        bundle.path().join(TOKENIZER_CONFIG_JSON),
        serde_json::to_string(&raw.tokenizer.config()).unwrap(),
    )
    .unwrap();

    let from_raw = Detector::from_raw(raw_dir.path()).unwrap();
    let from_bundle = Detector::from_bundle(bundle.path()).unwrap();
    for text in ["essential perspectives", "bus late", "completely unseen words"] {
        assert_eq!(from_raw.predict(text).unwrap(), from_bundle.predict(text).unwrap());
    }
}
