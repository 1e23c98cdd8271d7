//! The export pipeline: raw model → interchange/intermediate → bundle →
//! tokenizer → verification → cleanup.

use crate::converter::{converter_for, FormatConverter, NATIVE};
use crate::error::{ExportError, ExportResult};
use crate::stage::ExportStage;
use crate::strategy::{default_strategies, ConversionStrategy, INTERCHANGE_FILE, SAVED_MODEL_DIR};
use crate::verify::verify_bundle;
use kitha_model::bundle::{TOKENIZER_CONFIG_JSON, VOCAB_JSON};
use kitha_model::tokenizer::DEFAULT_MAX_LENGTH;
use kitha_model::RawModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Written to `tokenizer_config.json`.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default)]
    pub skip_interchange: bool,

    /// `"native"` (the default) or the converter program to run.
    #[serde(default = "default_converter")]
    pub converter: String,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_converter() -> String {
    NATIVE.to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { max_length: default_max_length(), skip_interchange: false, converter: default_converter() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub route: String,
    /// One entry per conversion route that failed before `route` succeeded.
    pub warnings: Vec<String>,
    pub converter: String,
    pub shard_count: usize,
    pub format: String,
    pub bundle_dir: PathBuf,
    pub stage: ExportStage,
}

pub struct ExportPipeline {
    config: ExportConfig,
    strategies: Vec<Box<dyn ConversionStrategy>>,
    converter: Box<dyn FormatConverter>,
}

impl ExportPipeline {
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        let strategies = default_strategies(config.skip_interchange);
        let converter = converter_for(&config.converter);
        Self { config, strategies, converter }
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ConversionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Box<dyn FormatConverter>) -> Self {
        self.converter = converter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run every stage. Intermediates are written into `bundle_dir` and
    /// removed once the bundle verifies.
    pub fn run(&self, raw_dir: &Path, bundle_dir: &Path) -> ExportResult<ExportReport> {
        let mut stage = ExportStage::RawModel;
        info!(raw = %raw_dir.display(), bundle = %bundle_dir.display(), "Starting export");
        std::fs::create_dir_all(bundle_dir).map_err(|e| ExportError::from(e).at(ExportStage::IntermediateFormat))?;

        let (route, warnings, saved_model) =
            self.intermediate(raw_dir, bundle_dir).map_err(|e| e.at(ExportStage::IntermediateFormat))?;
        advance(&mut stage, ExportStage::IntermediateFormat);

        self.converter.convert(&saved_model, bundle_dir).map_err(|e| e.at(ExportStage::ConvertedFormat))?;
        advance(&mut stage, ExportStage::ConvertedFormat);

        self.attach_tokenizer(raw_dir, bundle_dir).map_err(|e| e.at(ExportStage::TokenizerAttached))?;
        advance(&mut stage, ExportStage::TokenizerAttached);

        let check = verify_bundle(bundle_dir).map_err(|e| e.at(ExportStage::Verified))?;
        advance(&mut stage, ExportStage::Verified);

        cleanup(bundle_dir);
        advance(&mut stage, ExportStage::Cleaned);

        Ok(ExportReport {
            route,
            warnings,
            converter: self.converter.name().to_string(),
            shard_count: check.shard_count,
            format: check.format,
            bundle_dir: bundle_dir.to_path_buf(),
            stage,
        })
    }

    fn intermediate(&self, raw_dir: &Path, work_dir: &Path) -> ExportResult<(String, Vec<String>, PathBuf)> {
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        for strategy in &self.strategies {
            match strategy.convert(raw_dir, work_dir) {
                Ok(path) => return Ok((strategy.name().to_string(), warnings, path)),
                Err(e) => {
                    warn!(route = strategy.name(), error = %e, "Conversion route failed, trying next");
                    warnings.push(format!("{}: {e}", strategy.name()));
                    failures.push((strategy.name().to_string(), e.to_string()));
                }
            }
        }

        Err(ExportError::FallbackExhausted { failures })
    }

    fn attach_tokenizer(&self, raw_dir: &Path, bundle_dir: &Path) -> ExportResult<()> {
        let raw = RawModel::load(raw_dir)?;
        let mut config = raw.tokenizer.config();
        config.max_length = self.config.max_length;

        std::fs::write(bundle_dir.join(VOCAB_JSON), serde_json::to_string(&raw.tokenizer.vocab_map())?)?;
        std::fs::write(bundle_dir.join(TOKENIZER_CONFIG_JSON), serde_json::to_string_pretty(&config)?)?;
        debug!(vocab = config.vocab_size, max_length = config.max_length, "Tokenizer attached");
        Ok(())
    }
}

fn advance(stage: &mut ExportStage, to: ExportStage) {
    if stage.next() == Some(to) {
        debug!(from = %stage, to = %to, "Export stage transition");
        *stage = to;
    } else {
        error!(from = %stage, to = %to, "Invalid export stage transition");
    }
}

fn cleanup(bundle_dir: &Path) {
    let graph = bundle_dir.join(INTERCHANGE_FILE);
    if graph.exists() {
        if let Err(e) = std::fs::remove_file(&graph) {
            warn!(path = %graph.display(), error = %e, "Failed to remove interchange graph");
        }
    }
    let saved_model = bundle_dir.join(SAVED_MODEL_DIR);
    if saved_model.exists() {
        if let Err(e) = std::fs::remove_dir_all(&saved_model) {
            warn!(path = %saved_model.display(), error = %e, "Failed to remove serving intermediate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NativeConverter;
    use crate::strategy::DirectRoute;
    use crate::testing::write_raw_model;
    use kitha_model::Detector;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Broken;

    impl ConversionStrategy for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn convert(&self, _raw_dir: &Path, _work_dir: &Path) -> ExportResult<PathBuf> {
            Err(ExportError::Conversion { route: "broken".to_string(), reason: "tracing failed".to_string() })
        }
    }

    fn native() -> ExportPipeline {
        ExportPipeline::new(ExportConfig { converter: "native".to_string(), ..ExportConfig::default() })
    }

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.max_length, 128);
        assert!(!config.skip_interchange);
        assert_eq!(config.converter, "native");

        let parsed: ExportConfig = serde_json::from_str(r#"{"skip_interchange": true}"#).unwrap();
        assert!(parsed.skip_interchange);
        assert_eq!(parsed.max_length, 128);
    }

    #[test]
    fn test_default_config_exports_baseline_model() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let report = ExportPipeline::new(ExportConfig::default()).run(raw.path(), out.path()).unwrap();

        assert_eq!(report.stage, ExportStage::Cleaned);
        assert_eq!(report.converter, "native");
        assert!(out.path().join("model.json").is_file());
        assert!(Detector::from_bundle(out.path()).is_ok());
    }

    #[test]
    fn test_full_run_cleans_intermediates() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let report = native().run(raw.path(), out.path()).unwrap();

        assert_eq!(report.stage, ExportStage::Cleaned);
        assert_eq!(report.route, "interchange");
        assert!(report.warnings.is_empty());
        assert_eq!(report.format, "graph-model");
        assert_eq!(report.shard_count, 1);
        assert!(!out.path().join("model.onnx").exists());
        assert!(!out.path().join("saved_model").exists());

        let detector = Detector::from_bundle(out.path()).unwrap();
        assert_eq!(detector.max_length(), 128);
        let p = detector.predict("hello hello").unwrap();
        assert!(p.human > p.ai);
    }

    #[test]
    fn test_failing_primary_falls_back() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let pipeline = native().with_strategies(vec![Box::new(Broken), Box::new(DirectRoute)]);
        let report = pipeline.run(raw.path(), out.path()).unwrap();

        assert_eq!(report.route, "direct");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("broken:"));
        assert_eq!(report.stage, ExportStage::Cleaned);
    }

    #[test]
    fn test_all_routes_failing_is_fatal() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let pipeline = native().with_strategies(vec![Box::new(Broken), Box::new(Broken)]);
        let err = pipeline.run(raw.path(), out.path()).unwrap_err();

        assert_eq!(err.stage(), Some(ExportStage::IntermediateFormat));
        match err.cause() {
            ExportError::FallbackExhausted { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected cause: {other}"),
        }
    }

    #[test]
    fn test_skip_interchange_uses_direct_route() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let pipeline = ExportPipeline::new(ExportConfig {
            skip_interchange: true,
            converter: "native".to_string(),
            ..ExportConfig::default()
        });
        assert_eq!(pipeline.run(raw.path(), out.path()).unwrap().route, "direct");
    }

    #[test]
    fn test_converter_that_writes_nothing_fails_verification() {
        struct Noop;
        impl FormatConverter for Noop {
            fn name(&self) -> &str {
                "noop"
            }
            fn convert(&self, _saved_model: &Path, _bundle_dir: &Path) -> ExportResult<()> {
                Ok(())
            }
        }

        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let err = native().with_converter(Box::new(Noop)).run(raw.path(), out.path()).unwrap_err();
        assert_eq!(err.stage(), Some(ExportStage::Verified));
        assert!(matches!(err.cause(), ExportError::Verification { missing } if missing == "model.json"));
        // cleanup never ran
        assert!(out.path().join("saved_model").exists());
    }

    #[test]
    fn test_max_length_lands_in_tokenizer_config() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw_model(raw.path());

        let pipeline = ExportPipeline::new(ExportConfig { max_length: 64, ..ExportConfig::default() })
            .with_converter(Box::new(NativeConverter::default()));
        pipeline.run(raw.path(), out.path()).unwrap();

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.path().join("tokenizer_config.json")).unwrap()).unwrap();
        assert_eq!(config["max_length"], 64);
        assert_eq!(config["vocab_size"], 6);
    }
}
