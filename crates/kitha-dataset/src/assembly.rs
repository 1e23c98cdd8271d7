//! Assembly orchestrator: sources → normalizer → segmenter → balancer →
//! splitter → store.
//!
//! Sources are drained one after another. A source that cannot be reached,
//! changes schema, or fails mid-stream is degraded to what it yielded so far
//! and recorded in its [`SourceReport`]; it never aborts the run.

use crate::balance::{balance, shuffle_rng};
use crate::config::AssemblyConfig;
use crate::error::{DatasetError, DatasetResult};
use crate::layout::DatasetLayout;
use crate::normalize::Normalizer;
use crate::record::Record;
use crate::segment::Segmenter;
use crate::source::{SourceConnector, SourceSpec};
use crate::split::split;
use crate::store::{DatasetStats, DatasetStore};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Drained to the end or to its cap.
    Ok,
    /// Failed mid-stream; records read before the failure were kept.
    Partial,
    /// Nothing usable: unreachable, or the first row had the wrong schema.
    Failed,
    /// Not fetched because its group already reached the fill target.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub id: String,
    pub group: String,
    pub status: SourceStatus,
    pub rows_read: usize,
    pub records: usize,
    /// Rows or texts dropped by the length filter or label map.
    pub rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    fn new(spec: &SourceSpec) -> Self {
        Self {
            id: spec.id.clone(),
            group: spec.group_key().to_string(),
            status: SourceStatus::Ok,
            rows_read: 0,
            records: 0,
            rejected: 0,
            error: None,
        }
    }

    fn degrade(&mut self, status: SourceStatus, err: &DatasetError) {
        warn!(source = %self.id, status = ?status, error = %err, "source degraded");
        self.status = status;
        self.error = Some(err.to_string());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub output_dir: PathBuf,
    pub sources: Vec<SourceReport>,
    pub normalized_records: usize,
    pub segments: usize,
    pub balanced: usize,
    pub stats: DatasetStats,
}

impl AssemblyReport {
    #[must_use]
    pub fn degraded_sources(&self) -> Vec<&SourceReport> {
        self.sources.iter().filter(|s| matches!(s.status, SourceStatus::Partial | SourceStatus::Failed)).collect()
    }
}

struct Registered {
    spec: SourceSpec,
    connector: Box<dyn SourceConnector>,
}

pub struct Assembler {
    config: AssemblyConfig,
    sources: Vec<Registered>,
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("config", &self.config)
            .field("sources", &self.sources.iter().map(|s| s.spec.id.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Assembler {
    /// An assembler with no sources registered.
    pub fn new(config: AssemblyConfig) -> DatasetResult<Self> {
        config.validate()?;
        Ok(Self { config, sources: Vec::new() })
    }

    /// An assembler with every source listed in `config` registered.
    pub fn from_config(config: AssemblyConfig) -> DatasetResult<Self> {
        let specs = config.sources.clone();
        let mut assembler = Self::new(config)?;
        for spec in specs {
            assembler.register(spec)?;
        }
        Ok(assembler)
    }

    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Validate `spec` and register it with the connector its backend names.
    pub fn register(&mut self, spec: SourceSpec) -> DatasetResult<()> {
        spec.validate()?;
        let connector = spec.connector(&self.config.hub)?;
        self.push(spec, connector)
    }

    /// Register `spec` with an explicit connector.
    pub fn register_with(&mut self, spec: SourceSpec, connector: Box<dyn SourceConnector>) -> DatasetResult<()> {
        spec.validate()?;
        self.push(spec, connector)
    }

    fn push(&mut self, spec: SourceSpec, connector: Box<dyn SourceConnector>) -> DatasetResult<()> {
        if self.sources.iter().any(|s| s.spec.id == spec.id) {
            return Err(DatasetError::Config(format!("source '{}' registered twice", spec.id)));
        }
        self.sources.push(Registered { spec, connector });
        Ok(())
    }

    /// Drain every source into canonical records.
    #[must_use]
    pub fn collect(&self) -> (Vec<Record>, Vec<SourceReport>) {
        let normalizer = Normalizer::new(self.config.min_record_chars);
        let mut group_counts: HashMap<String, usize> = HashMap::new();
        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(self.sources.len());

        for Registered { spec, connector } in &self.sources {
            let mut report = SourceReport::new(spec);
            let held = group_counts.get(spec.group_key()).copied().unwrap_or(0);

            if spec.supplemental && held >= self.config.supplemental_target() {
                info!(source = %spec.id, group = %report.group, held, "group already filled, skipping");
                report.status = SourceStatus::Skipped;
                reports.push(report);
                continue;
            }
            let remaining = self.config.max_samples.map_or(usize::MAX, |cap| cap.saturating_sub(held));
            if remaining == 0 {
                report.status = SourceStatus::Skipped;
                reports.push(report);
                continue;
            }

            info!(source = %spec.id, "fetching source");
            let taken = self.drain(spec, connector.as_ref(), &normalizer, remaining, &mut records, &mut report);
            *group_counts.entry(spec.group_key().to_string()).or_default() += taken;

            info!(
                source = %spec.id,
                status = ?report.status,
                rows = report.rows_read,
                records = report.records,
                rejected = report.rejected,
                "source done"
            );
            reports.push(report);
        }

        (records, reports)
    }

    fn drain(
        &self,
        spec: &SourceSpec,
        connector: &dyn SourceConnector,
        normalizer: &Normalizer,
        remaining: usize,
        out: &mut Vec<Record>,
        report: &mut SourceReport,
    ) -> usize {
        let hint = self.config.max_samples.map(|_| remaining);
        let stream = match connector.open(hint) {
            Ok(stream) => stream,
            Err(e) => {
                report.degrade(SourceStatus::Failed, &e);
                return 0;
            }
        };

        let mut taken = 0;
        for item in stream {
            let row = match item {
                Ok(row) => row,
                Err(e) => {
                    let status = if report.rows_read == 0 { SourceStatus::Failed } else { SourceStatus::Partial };
                    report.degrade(status, &e);
                    break;
                }
            };

            if report.rows_read == 0 {
                if let Err(e) = spec.layout.check_schema(&spec.id, &row) {
                    report.degrade(SourceStatus::Failed, &e);
                    break;
                }
            }
            report.rows_read += 1;

            let normalized = normalizer.normalize(spec, &row);
            report.rejected += normalized.rejected;
            for record in normalized.records {
                if taken == remaining {
                    break;
                }
                out.push(record);
                taken += 1;
            }
            if taken == remaining {
                break;
            }
        }

        report.records = taken;
        taken
    }

    /// Run the full pipeline and persist the dataset.
    pub fn run(&self) -> DatasetResult<AssemblyReport> {
        let (records, sources) = self.collect();
        let normalized_records = records.len();

        let segmenter = Segmenter::new(self.config.max_length, self.config.min_chunk_chars);
        let segments = segmenter.segment_all(&records);
        let segment_count = segments.len();
        info!(records = normalized_records, segments = segment_count, "segmented");

        let mut rng = shuffle_rng(self.config.seed);
        let balanced = balance(segments, self.config.max_per_class, &mut rng);
        if balanced.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }
        let balanced_count = balanced.len();
        info!(records = balanced_count, per_class = balanced_count / 2, "balanced");

        let splits = split(balanced, &mut rng);
        let store = DatasetStore::new(DatasetLayout::new(self.config.output_dir.clone()));
        let stats = store.save_splits(&splits)?;
        info!(
            dir = %self.config.output_dir.display(),
            train = stats.train_samples,
            val = stats.val_samples,
            test = stats.test_samples,
            dataset_id = %stats.dataset_id,
            "dataset written"
        );

        Ok(AssemblyReport {
            output_dir: self.config.output_dir.clone(),
            sources,
            normalized_records,
            segments: segment_count,
            balanced: balanced_count,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelMap;
    use crate::source::{Backend, RawRow, RecordLayout, RowStream};
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Yields fixed rows, optionally failing after them.
    struct FixedRows {
        id: String,
        rows: Vec<RawRow>,
        fail_open: bool,
        fail_after: bool,
    }

    impl FixedRows {
        fn new(id: &str, rows: Vec<RawRow>) -> Self {
            Self { id: id.to_string(), rows, fail_open: false, fail_after: false }
        }
    }

    impl SourceConnector for FixedRows {
        fn id(&self) -> &str {
            &self.id
        }

        fn open(&self, _limit_hint: Option<usize>) -> DatasetResult<RowStream<'_>> {
            if self.fail_open {
                return Err(DatasetError::unavailable(&self.id, "connection refused"));
            }
            let rows = self.rows.clone().into_iter().map(Ok);
            if self.fail_after {
                let tail = std::iter::once(Err(DatasetError::unavailable(&self.id, "reset by peer")));
                Ok(Box::new(rows.chain(tail)))
            } else {
                Ok(Box::new(rows))
            }
        }
    }

    fn spec(id: &str, group: Option<&str>, supplemental: bool) -> SourceSpec {
        SourceSpec {
            id: id.to_string(),
            category: "mixed".to_string(),
            backend: Backend::Jsonl { path: PathBuf::from(format!("{id}.jsonl")) },
            layout: RecordLayout::Labeled {
                text_field: "text".to_string(),
                label_fields: vec!["label".to_string()],
                source_field: None,
            },
            labels: LabelMap::default(),
            group: group.map(str::to_string),
            supplemental,
        }
    }

    fn rows(n: usize) -> Vec<RawRow> {
        (0..n)
            .map(|i| {
                json!({"text": format!("sample text number {i} long enough"), "label": i % 2})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect()
    }

    fn config(dir: &TempDir) -> AssemblyConfig {
        AssemblyConfig {
            output_dir: dir.path().to_path_buf(),
            seed: Some(11),
            sources: Vec::new(),
            ..AssemblyConfig::default()
        }
    }

    #[test]
    fn test_unreachable_source_degrades_without_aborting() {
        let temp = TempDir::new().unwrap();
        let mut assembler = Assembler::new(config(&temp)).unwrap();
        let mut down = FixedRows::new("down", vec![]);
        down.fail_open = true;
        assembler.register_with(spec("down", None, false), Box::new(down)).unwrap();
        assembler.register_with(spec("up", None, false), Box::new(FixedRows::new("up", rows(20)))).unwrap();

        let report = assembler.run().unwrap();

        assert_eq!(report.sources[0].status, SourceStatus::Failed);
        assert!(report.sources[0].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(report.sources[1].status, SourceStatus::Ok);
        assert_eq!(report.stats.total_samples, 20);
        assert_eq!(report.degraded_sources().len(), 1);
    }

    #[test]
    fn test_mid_stream_failure_keeps_rows_read() {
        let temp = TempDir::new().unwrap();
        let mut assembler = Assembler::new(config(&temp)).unwrap();
        let mut flaky = FixedRows::new("flaky", rows(6));
        flaky.fail_after = true;
        assembler.register_with(spec("flaky", None, false), Box::new(flaky)).unwrap();

        let (records, reports) = assembler.collect();

        assert_eq!(records.len(), 6);
        assert_eq!(reports[0].status, SourceStatus::Partial);
        assert_eq!(reports[0].records, 6);
    }

    #[test]
    fn test_schema_mismatch_on_first_row_fails_source() {
        let temp = TempDir::new().unwrap();
        let mut assembler = Assembler::new(config(&temp)).unwrap();
        let bad = vec![json!({"body": "no text column here at all"}).as_object().cloned().unwrap()];
        assembler.register_with(spec("bad", None, false), Box::new(FixedRows::new("bad", bad))).unwrap();

        let (records, reports) = assembler.collect();
        assert!(records.is_empty());
        assert_eq!(reports[0].status, SourceStatus::Failed);
    }

    #[test]
    fn test_group_cap_is_shared_and_supplemental_skipped_when_full() {
        let temp = TempDir::new().unwrap();
        let mut assembler =
            Assembler::new(AssemblyConfig { max_samples: Some(8), ..config(&temp) }).unwrap();
        assembler
            .register_with(spec("a", Some("extra"), false), Box::new(FixedRows::new("a", rows(5))))
            .unwrap();
        assembler
            .register_with(spec("b", Some("extra"), true), Box::new(FixedRows::new("b", rows(10))))
            .unwrap();
        assembler
            .register_with(spec("c", Some("extra"), true), Box::new(FixedRows::new("c", rows(10))))
            .unwrap();

        let (records, reports) = assembler.collect();

        assert_eq!(reports[0].records, 5);
        assert_eq!(reports[1].records, 3);
        assert_eq!(reports[2].status, SourceStatus::Skipped);
        assert_eq!(records.len(), 8);
    }

    #[test]
    fn test_single_class_corpus_is_empty_dataset() {
        let temp = TempDir::new().unwrap();
        let mut assembler = Assembler::new(config(&temp)).unwrap();
        let human_only: Vec<RawRow> = rows(10)
            .into_iter()
            .map(|mut r| {
                r.insert("label".to_string(), json!(0));
                r
            })
            .collect();
        assembler
            .register_with(spec("h", None, false), Box::new(FixedRows::new("h", human_only)))
            .unwrap();

        assert!(matches!(assembler.run(), Err(DatasetError::EmptyDataset)));
        assert!(!temp.path().join("train.json").exists());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let temp = TempDir::new().unwrap();
        let mut assembler = Assembler::new(config(&temp)).unwrap();
        assembler.register_with(spec("a", None, false), Box::new(FixedRows::new("a", vec![]))).unwrap();
        let err = assembler
            .register_with(spec("a", None, false), Box::new(FixedRows::new("a", vec![])))
            .unwrap_err();
        assert!(matches!(err, DatasetError::Config(_)));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let temp = TempDir::new().unwrap();
            let mut assembler = Assembler::new(config(&temp)).unwrap();
            assembler.register_with(spec("s", None, false), Box::new(FixedRows::new("s", rows(40)))).unwrap();
            assembler.run().unwrap().stats.dataset_id
        };
        assert_eq!(run(), run());
    }
}
