//! Integration tests for the `kitha` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn kitha(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kitha").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").env_remove("KITHA_DATA_DIR").env_remove("KITHA_SEED");
    cmd
}

/// A JSONL corpus and a config pointing the assembler at it.
fn write_project(dir: &Path) {
    let mut lines = Vec::new();
    for i in 0..30 {
        lines.push(json!({ "text": format!("lol the bus was late again so i walked home {i}"), "label": 0 }).to_string());
        lines.push(
            json!({ "text": format!("In conclusion, it is essential to consider multiple perspectives {i}."), "label": 1 })
                .to_string(),
        );
    }
    std::fs::write(dir.join("corpus.jsonl"), lines.join("\n")).unwrap();

    let config = format!(
        r#"
[assembly]
output_dir = "{data}"
seed = 42

[[assembly.sources]]
id = "local"
category = "mixed"
backend = {{ type = "jsonl", path = "{corpus}" }}
layout = {{ kind = "labeled", text_field = "text", label_fields = ["label"] }}

[train]
min_frequency = 1

[export]
converter = "native"
"#,
        data = dir.join("data").display(),
        corpus = dir.join("corpus.jsonl").display(),
    );
    std::fs::write(dir.join("kitha.toml"), config).unwrap();
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    kitha(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("assemble"))
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_assemble_train_export() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let output = kitha(temp.path()).args(["--json", "assemble"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stats"]["total_samples"], 60);
    assert_eq!(report["stats"]["human_samples"], 30);
    assert!(temp.path().join("data/train.json").is_file());
    assert!(temp.path().join("data/stats.json").is_file());

    kitha(temp.path())
        .args(["train", "--output", "model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Training complete"));
    assert!(temp.path().join("model/training_manifest.json").is_file());

    let output = kitha(temp.path()).args(["export", "--model", "model", "--output", "bundle", "--json"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["route"], "interchange");
    assert_eq!(report["stage"], "CLEANED");
    assert_eq!(report["converter"], "native");
    for file in ["model.json", "group1-shard1of1.bin", "vocab.json", "tokenizer_config.json"] {
        assert!(temp.path().join("bundle").join(file).is_file(), "missing {file}");
    }
    assert!(!temp.path().join("bundle/saved_model").exists());
}

#[test]
fn test_flags_override_config() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    kitha(temp.path())
        .args(["assemble", "--output", "elsewhere", "--max-per-class", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset assembled"));

    let stats: Value =
        serde_json::from_str(&std::fs::read_to_string(temp.path().join("elsewhere/stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["total_samples"], 10);
}

#[test]
fn test_export_of_missing_model_fails() {
    let temp = TempDir::new().unwrap();
    kitha(temp.path())
        .args(["export", "--model", "nope", "--output", "bundle", "--converter", "native"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Export failed"));
}

#[test]
fn test_missing_config_file_fails() {
    let temp = TempDir::new().unwrap();
    kitha(temp.path())
        .args(["--config", "absent.toml", "assemble"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
