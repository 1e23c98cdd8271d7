use crate::error::DatasetResult;
use std::path::{Path, PathBuf};

/// Names of the record sets every assembly run writes.
pub const SPLIT_NAMES: [&str; 4] = ["train", "val", "test", "full"];

/// On-disk format of a persisted record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Filesystem layout of an assembled dataset directory.
///
/// ```text
/// <root>/
///   train.json  train.csv
///   val.json    val.csv
///   test.json   test.csv
///   full.json   full.csv
///   stats.json
/// ```
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn set_path(&self, name: &str, format: Format) -> PathBuf {
        self.root.join(format!("{name}.{}", format.extension()))
    }

    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.root.join("stats.json")
    }

    pub fn ensure_dirs(&self) -> DatasetResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = DatasetLayout::new(temp.path().join("processed"));
        layout.ensure_dirs().unwrap();

        assert!(layout.root().is_dir());
        assert!(layout.set_path("train", Format::Csv).ends_with("processed/train.csv"));
        assert!(layout.stats_path().ends_with("processed/stats.json"));
    }
}
