//! Output module for exporting records and reporting runs
//!
//! This module handles:
//! - Exporting extracted records as CSV or JSON
//! - Printing the run summary

mod csv_export;
mod json_export;
pub mod summary;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use summary::{format_summary, print_summary};

use crate::config::OutputFormat;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes a finished batch of records
pub trait Exporter<R: Serialize> {
    /// Writes `records`, returning how many were written
    fn export(&self, records: &[R]) -> OutputResult<usize>;
}

/// Returns the exporter for `format` writing to `path`
///
/// # Example
///
/// ```no_run
/// use gleaner::config::OutputFormat;
/// use gleaner::extract::PageInfo;
/// use gleaner::output::exporter_for;
///
/// let exporter = exporter_for::<PageInfo>(OutputFormat::Json, "pages.json");
/// exporter.export(&[]).unwrap();
/// ```
pub fn exporter_for<R: Serialize>(
    format: OutputFormat,
    path: impl Into<PathBuf>,
) -> Box<dyn Exporter<R>> {
    match format {
        OutputFormat::Csv => Box::new(CsvExporter::new(path)),
        OutputFormat::Json => Box::new(JsonExporter::new(path)),
    }
}
