//! Dataset store: named record sets in JSON and CSV plus `stats.json`.
//!
//! Both formats of a set are written to staged temp files in the output
//! directory and only renamed into place once both are complete, so a reader
//! never observes a half-written set.

use crate::error::{DatasetError, DatasetResult};
use crate::layout::{DatasetLayout, Format, SPLIT_NAMES};
use crate::record::{char_len, Label, SegmentedRecord};
use crate::split::Splits;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

const CSV_HEADER: [&str; 5] = ["text", "label", "source", "category", "text_type"];

/// Aggregate statistics written next to the record sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub train_samples: usize,
    pub val_samples: usize,
    pub test_samples: usize,
    pub human_samples: usize,
    pub ai_samples: usize,
    pub sources: Vec<String>,
    pub avg_text_length: f64,
    /// SHA-256 of the `full` set; changes whenever the corpus does.
    pub dataset_id: String,
}

impl DatasetStats {
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(splits: &Splits<SegmentedRecord>) -> DatasetResult<Self> {
        let full = splits.full();
        let human_samples = full.iter().filter(|r| r.label == Label::Human).count();
        let sources: BTreeSet<&str> = full.iter().map(|r| r.source.as_str()).collect();
        let avg_text_length = if full.is_empty() {
            0.0
        } else {
            full.iter().map(|r| char_len(&r.text)).sum::<usize>() as f64 / full.len() as f64
        };

        Ok(Self {
            total_samples: full.len(),
            train_samples: splits.train.len(),
            val_samples: splits.val.len(),
            test_samples: splits.test.len(),
            human_samples,
            ai_samples: full.len() - human_samples,
            sources: sources.into_iter().map(str::to_string).collect(),
            avg_text_length,
            dataset_id: dataset_id(&full)?,
        })
    }
}

/// Content hash of an ordered record list.
pub fn dataset_id(records: &[SegmentedRecord]) -> DatasetResult<String> {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(serde_json::to_vec(record)?);
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    layout: DatasetLayout,
}

impl DatasetStore {
    #[must_use]
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn open(root: &Path) -> Self {
        Self::new(DatasetLayout::new(root.to_path_buf()))
    }

    #[must_use]
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Persist one named set in both formats.
    pub fn save(&self, name: &str, records: &[SegmentedRecord]) -> DatasetResult<()> {
        self.layout.ensure_dirs()?;
        let dir = self.layout.root();

        let mut json_tmp = staged(dir, name, Format::Json)?;
        {
            let mut writer = BufWriter::new(&mut json_tmp);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }

        let mut csv_tmp = staged(dir, name, Format::Csv)?;
        {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(&mut csv_tmp);
            writer.write_record(CSV_HEADER)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        json_tmp.persist(self.layout.set_path(name, Format::Json)).map_err(|e| e.error)?;
        csv_tmp.persist(self.layout.set_path(name, Format::Csv)).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn load(&self, name: &str, format: Format) -> DatasetResult<Vec<SegmentedRecord>> {
        let path = self.layout.set_path(name, format);
        if !path.is_file() {
            return Err(DatasetError::NotFound(format!("{name} ({})", path.display())));
        }

        match format {
            Format::Json => {
                let reader = BufReader::new(File::open(&path)?);
                Ok(serde_json::from_reader(reader)?)
            }
            Format::Csv => {
                let mut reader = csv::Reader::from_path(&path)?;
                let records = reader.deserialize().collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            }
        }
    }

    /// Write `train`, `val`, `test`, `full` and `stats.json`.
    pub fn save_splits(&self, splits: &Splits<SegmentedRecord>) -> DatasetResult<DatasetStats> {
        let full = splits.full();
        for (name, records) in SPLIT_NAMES.iter().zip([
            splits.train.as_slice(),
            splits.val.as_slice(),
            splits.test.as_slice(),
            full.as_slice(),
        ]) {
            self.save(name, records)?;
            info!(set = name, records = records.len(), "saved record set");
        }

        let stats = DatasetStats::compute(splits)?;
        self.save_stats(&stats)?;
        Ok(stats)
    }

    pub fn save_stats(&self, stats: &DatasetStats) -> DatasetResult<()> {
        self.layout.ensure_dirs()?;
        let json = serde_json::to_string_pretty(stats)?;
        std::fs::write(self.layout.stats_path(), json)?;
        Ok(())
    }

    pub fn load_stats(&self) -> DatasetResult<DatasetStats> {
        let path = self.layout.stats_path();
        if !path.is_file() {
            return Err(DatasetError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn staged(dir: &Path, name: &str, format: Format) -> DatasetResult<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(&format!(".{}.tmp", format.extension()))
        .tempfile_in(dir)?)
}
