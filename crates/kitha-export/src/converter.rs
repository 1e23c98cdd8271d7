//! `saved_model/` → browser bundle converters.

use crate::error::{ExportError, ExportResult};
use crate::strategy::{SavedModel, SERVE_TAG, SIGNATURE_NAME};
use kitha_model::{write_bundle, MAX_SHARD_BYTES};
use serde_json::json;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub const DEFAULT_CONVERTER_PROGRAM: &str = "tensorflowjs_converter";

/// Converter name that selects [`NativeConverter`] in configuration.
pub const NATIVE: &str = "native";

pub trait FormatConverter: Send + Sync {
    fn name(&self) -> &str;

    /// Write the bundle (`model.json` plus shards) into `bundle_dir`.
    fn convert(&self, saved_model: &Path, bundle_dir: &Path) -> ExportResult<()>;
}

/// Runs an external converter program.
#[derive(Debug, Clone)]
pub struct SubprocessConverter {
    program: String,
    leading_args: Vec<String>,
}

impl SubprocessConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), leading_args: Vec::new() }
    }

    /// Arguments placed before the converter flags, e.g. a script path
    /// when `program` is an interpreter.
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn args(&self, saved_model: &Path, bundle_dir: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "--input_format=tf_saved_model".to_string(),
            "--output_format=tfjs_graph_model".to_string(),
            format!("--signature_name={SIGNATURE_NAME}"),
            format!("--saved_model_tags={SERVE_TAG}"),
            saved_model.display().to_string(),
            bundle_dir.display().to_string(),
        ]);
        args
    }
}

impl Default for SubprocessConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_PROGRAM)
    }
}

impl FormatConverter for SubprocessConverter {
    fn name(&self) -> &str {
        &self.program
    }

    fn convert(&self, saved_model: &Path, bundle_dir: &Path) -> ExportResult<()> {
        let args = self.args(saved_model, bundle_dir);
        debug!(program = %self.program, ?args, "Running converter");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| ExportError::ExternalTool {
            program: self.program.clone(),
            status: None,
            stderr: format!("failed to start: {e}"),
        })?;

        if !output.status.success() {
            return Err(ExportError::ExternalTool {
                program: self.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(program = %self.program, "Converter finished");
        Ok(())
    }
}

/// In-process converter for the baseline model family.
#[derive(Debug, Clone)]
pub struct NativeConverter {
    max_shard_bytes: usize,
}

impl NativeConverter {
    #[must_use]
    pub fn new(max_shard_bytes: usize) -> Self {
        Self { max_shard_bytes }
    }
}

impl Default for NativeConverter {
    fn default() -> Self {
        Self::new(MAX_SHARD_BYTES)
    }
}

impl FormatConverter for NativeConverter {
    fn name(&self) -> &str {
        NATIVE
    }

    fn convert(&self, saved_model: &Path, bundle_dir: &Path) -> ExportResult<()> {
        let model = SavedModel::load(saved_model)?;
        let topology = json!({
            "signatureName": model.meta.signature_name,
            "tags": model.meta.tags,
            "signature": model.meta.signature,
        });
        let converted_by = concat!("kitha-export ", env!("CARGO_PKG_VERSION"));
        let manifest = write_bundle(bundle_dir, &model.tensors, self.max_shard_bytes, topology, converted_by)?;
        info!(shards = manifest.shard_count(), dir = %bundle_dir.display(), "Native bundle written");
        Ok(())
    }
}

/// `"native"` selects the in-process converter; anything else is a program.
#[must_use]
pub fn converter_for(choice: &str) -> Box<dyn FormatConverter> {
    if choice == NATIVE {
        Box::new(NativeConverter::default())
    } else {
        Box::new(SubprocessConverter::new(choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ConversionStrategy, DirectRoute};
    use crate::testing::write_raw_model;
    use kitha_model::read_bundle;
    use tempfile::TempDir;

    #[test]
    fn test_subprocess_arguments() {
        let conv = SubprocessConverter::default();
        let args = conv.args(Path::new("/w/saved_model"), Path::new("/out"));
        assert_eq!(conv.program(), "tensorflowjs_converter");
        assert_eq!(
            args,
            vec![
                "--input_format=tf_saved_model",
                "--output_format=tfjs_graph_model",
                "--signature_name=serving_default",
                "--saved_model_tags=serve",
                "/w/saved_model",
                "/out",
            ]
        );
    }

    #[test]
    fn test_missing_program_is_external_tool_failure() {
        let conv = SubprocessConverter::new("kitha-no-such-converter-binary");
        let err = conv.convert(Path::new("a"), Path::new("b")).unwrap_err();
        assert!(matches!(err, ExportError::ExternalTool { status: None, .. }));
    }

    #[test]
    fn test_native_converter_writes_small_shards() {
        let raw = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let bundle = TempDir::new().unwrap();
        write_raw_model(raw.path());
        let saved = DirectRoute.convert(raw.path(), work.path()).unwrap();

        NativeConverter::new(16).convert(&saved, bundle.path()).unwrap();

        let (manifest, tensors) = read_bundle(bundle.path()).unwrap();
        assert!(manifest.shard_count() > 1);
        assert_eq!(tensors, SavedModel::load(&saved).unwrap().tensors);
        assert_eq!(manifest.model_topology["signatureName"], "serving_default");
    }

    #[test]
    fn test_converter_choice() {
        assert_eq!(converter_for("native").name(), "native");
        assert_eq!(converter_for("tensorflowjs_converter").name(), "tensorflowjs_converter");
    }
}
