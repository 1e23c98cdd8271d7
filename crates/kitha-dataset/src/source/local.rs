//! Local file connectors (JSON lines and CSV exports).

use super::{RawRow, RowStream, SourceConnector};
use crate::error::{DatasetError, DatasetResult};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JsonlConnector {
    id: String,
    path: PathBuf,
}

impl JsonlConnector {
    pub fn new(id: &str, path: PathBuf) -> Self {
        Self { id: id.to_string(), path }
    }
}

impl SourceConnector for JsonlConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, _limit_hint: Option<usize>) -> DatasetResult<RowStream<'_>> {
        let file = File::open(&self.path).map_err(|e| {
            DatasetError::unavailable(&self.id, format!("{}: {e}", self.path.display()))
        })?;

        let rows = BufReader::new(file)
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(move |(idx, line)| {
                let line = line.map_err(|e| DatasetError::unavailable(&self.id, e))?;
                match serde_json::from_str::<Value>(&line) {
                    Ok(Value::Object(row)) => Ok(row),
                    Ok(_) => Err(DatasetError::schema(
                        &self.id,
                        format!("line {} is not a JSON object", idx + 1),
                    )),
                    Err(e) => Err(DatasetError::schema(
                        &self.id,
                        format!("line {}: {e}", idx + 1),
                    )),
                }
            });
        Ok(Box::new(rows))
    }
}

#[derive(Debug, Clone)]
pub struct CsvConnector {
    id: String,
    path: PathBuf,
}

impl CsvConnector {
    pub fn new(id: &str, path: PathBuf) -> Self {
        Self { id: id.to_string(), path }
    }
}

impl SourceConnector for CsvConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, _limit_hint: Option<usize>) -> DatasetResult<RowStream<'_>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| DatasetError::unavailable(&self.id, e))?;
        let headers = reader.headers().map_err(|e| DatasetError::schema(&self.id, e))?.clone();

        let rows = reader.into_records().map(move |record| {
            let record = record.map_err(|e| DatasetError::schema(&self.id, e))?;
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            Ok(row)
        });
        Ok(Box::new(rows))
    }
}
