//! Source connectors and their declarative specs.
//!
//! Ownership model:
//! - `SourceSpec` is the configuration-facing description of one corpus:
//!   where it lives, how a raw row becomes records, how labels are encoded.
//! - `SourceConnector` turns a spec's backend into a lazy stream of raw rows.
//! - Row-to-record interpretation lives in [`crate::normalize`], so a
//!   connector never needs to know about labels.

use crate::error::{DatasetError, DatasetResult};
use crate::labels::LabelMap;
use crate::record::Label;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub mod catalog;
pub mod hub;
pub mod local;

pub use hub::{HubConnector, HubSettings};
pub use local::{CsvConnector, JsonlConnector};

/// One raw heterogeneous key-value row as yielded by a backend.
pub type RawRow = serde_json::Map<String, Value>;

/// Lazy row stream. An `Err` item ends the stream; rows already yielded stay valid.
pub type RowStream<'a> = Box<dyn Iterator<Item = DatasetResult<RawRow>> + 'a>;

/// A fetchable corpus.
pub trait SourceConnector: Send + Sync {
    /// Stable source identifier used in records and reports.
    fn id(&self) -> &str;

    /// Open a lazy row stream.
    ///
    /// `limit_hint` is the most rows the caller may consume; backends can use
    /// it to size pages. Returns `Err` when the source cannot be reached at all.
    fn open(&self, limit_hint: Option<usize>) -> DatasetResult<RowStream<'_>>;
}

/// Where a source's rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    /// Hugging Face datasets-server rows API.
    Hub {
        dataset: String,
        #[serde(default)]
        config: Option<String>,
        #[serde(default = "default_split")]
        split: String,
    },
    /// Local JSON-lines file, one object per line.
    Jsonl { path: PathBuf },
    /// Local CSV file with a header row.
    Csv { path: PathBuf },
}

fn default_split() -> String {
    "train".to_string()
}

/// How one raw row yields records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordLayout {
    /// One text column plus a label column.
    Labeled {
        text_field: String,
        /// Candidate label columns; the first one present in the row is used.
        #[serde(default)]
        label_fields: Vec<String>,
        /// Column whose value is appended to the source id (`<id>_<value>`).
        #[serde(default)]
        source_field: Option<String>,
    },
    /// Human and AI texts side by side in the same row.
    Paired { entries: Vec<PairedField> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedField {
    /// Alternative column names; the first non-empty one is used.
    pub fields: Vec<String>,
    pub label: Label,
}

impl PairedField {
    pub fn new(fields: &[&str], label: Label) -> Self {
        Self { fields: fields.iter().map(|f| (*f).to_string()).collect(), label }
    }
}

impl RecordLayout {
    fn validate(&self, source_id: &str) -> DatasetResult<()> {
        let bad = |msg: &str| DatasetError::Config(format!("source '{source_id}': {msg}"));
        match self {
            Self::Labeled { text_field, .. } if text_field.trim().is_empty() => {
                Err(bad("text_field must not be empty"))
            }
            Self::Labeled { .. } => Ok(()),
            Self::Paired { entries } if entries.is_empty() => {
                Err(bad("paired layout needs at least one entry"))
            }
            Self::Paired { entries } => {
                if entries.iter().any(|e| e.fields.is_empty()) {
                    return Err(bad("every paired entry needs at least one field"));
                }
                Ok(())
            }
        }
    }

    /// Check that a row carries the columns this layout expects.
    ///
    /// Applied to the first row of a stream: a mismatch there means the
    /// upstream schema changed and the whole source is degraded.
    pub fn check_schema(&self, source_id: &str, row: &RawRow) -> DatasetResult<()> {
        match self {
            Self::Labeled { text_field, .. } => {
                if row.contains_key(text_field) {
                    Ok(())
                } else {
                    Err(DatasetError::schema(
                        source_id,
                        format!("missing text column '{text_field}' (columns: {})", columns(row)),
                    ))
                }
            }
            Self::Paired { entries } => {
                let any = entries.iter().flat_map(|e| &e.fields).any(|f| row.contains_key(f));
                if any {
                    Ok(())
                } else {
                    Err(DatasetError::schema(
                        source_id,
                        format!("none of the paired columns present (columns: {})", columns(row)),
                    ))
                }
            }
        }
    }
}

fn columns(row: &RawRow) -> String {
    row.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Declarative description of one corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub category: String,
    pub backend: Backend,
    pub layout: RecordLayout,
    #[serde(default)]
    pub labels: LabelMap,
    /// Sources sharing a group share one sample cap.
    #[serde(default)]
    pub group: Option<String>,
    /// Only fetched while the group is still below its fill target.
    #[serde(default)]
    pub supplemental: bool,
}

impl SourceSpec {
    /// Validate the spec; called once at registration.
    pub fn validate(&self) -> DatasetResult<()> {
        if self.id.trim().is_empty() {
            return Err(DatasetError::Config("source id must not be empty".to_string()));
        }
        self.layout.validate(&self.id)?;
        self.labels.validate(&self.id)
    }

    #[must_use]
    pub fn group_key(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.id)
    }

    /// Build the connector for this spec's backend.
    pub fn connector(&self, hub: &HubSettings) -> DatasetResult<Box<dyn SourceConnector>> {
        Ok(match &self.backend {
            Backend::Hub { dataset, config, split } => Box::new(HubConnector::new(
                &self.id,
                hub,
                dataset,
                config.as_deref(),
                split,
            )?),
            Backend::Jsonl { path } => Box::new(JsonlConnector::new(&self.id, path.clone())),
            Backend::Csv { path } => Box::new(CsvConnector::new(&self.id, path.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_source_spec_deserializes_from_toml() {
        let spec: SourceSpec = toml::from_str(
            r#"
            id = "tweepfake"
            category = "tweet"
            backend = { type = "csv", path = "data/tweepfake.csv" }
            layout = { kind = "labeled", text_field = "text", label_fields = ["account.type"] }
            labels = { human_strings = ["human"], ai_strings = ["bot"], match_mode = "contains", unmatched = "skip" }
            "#,
        )
        .unwrap();

        assert_eq!(spec.backend, Backend::Csv { path: PathBuf::from("data/tweepfake.csv") });
        assert!(spec.validate().is_ok());
        assert_eq!(spec.group_key(), "tweepfake");
    }

    #[test]
    fn test_check_schema_reports_missing_columns() {
        let layout = RecordLayout::Labeled {
            text_field: "text".to_string(),
            label_fields: vec!["label".to_string()],
            source_field: None,
        };
        assert!(layout.check_schema("s", &row(json!({"text": "x"}))).is_ok());
        let err = layout.check_schema("s", &row(json!({"body": "x"}))).unwrap_err();
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_paired_layout_requires_entries() {
        let spec = SourceSpec {
            id: "p".to_string(),
            category: "qa".to_string(),
            backend: Backend::Jsonl { path: PathBuf::from("p.jsonl") },
            layout: RecordLayout::Paired { entries: vec![] },
            labels: LabelMap::default(),
            group: None,
            supplemental: false,
        };
        assert!(spec.validate().is_err());
    }
}
