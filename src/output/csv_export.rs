use super::{Exporter, OutputResult};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes records as CSV, one row per record
///
/// The header row is taken from the record's field names.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Serialize> Exporter<R> for CsvExporter {
    fn export(&self, records: &[R]) -> OutputResult<usize> {
        let file = File::create(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}
