//! Kitha Export
//!
//! Turns a trained raw model directory into a browser-loadable bundle:
//! `model.json`, `group*.bin` weight shards, `vocab.json` and
//! `tokenizer_config.json`. Conversion routes are tried in order, the
//! bundle is written by an external converter or the in-process native
//! one, and intermediates are removed only after the bundle verifies.

pub mod converter;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod strategy;
pub mod verify;

#[cfg(test)]
mod testing;

pub use converter::{converter_for, FormatConverter, NativeConverter, SubprocessConverter};
pub use error::{ExportError, ExportResult};
pub use pipeline::{ExportConfig, ExportPipeline, ExportReport};
pub use stage::ExportStage;
pub use strategy::{default_strategies, ConversionStrategy, DirectRoute, InterchangeRoute, SavedModel};
pub use verify::{verify_bundle, BundleCheck};
