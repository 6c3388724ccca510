//! CSV output formatter for duplicate scan results.
//!
//! Provides machine-readable CSV output for spreadsheets and data analysis.
//! One row is generated for each file in a duplicate set; the header row is
//! written even when there are no duplicates.
//!
//! # Columns
//!
//! - `group`: 1-based group number, in key order
//! - `key`: group key (`<algorithm>:<hex digest>` or `size:<bytes>`)
//! - `path`: Absolute path to the file
//! - `size`: File size in bytes
//! - `size_human`: File size with a binary unit suffix
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::DuplicateReport;
//! use dupefind::output::csv::CsvOutput;
//!
//! let report = DuplicateReport::new();
//! let csv = CsvOutput::new(&report).to_string().unwrap();
//! assert_eq!(csv, "group,key,path,size,size_human\n");
//! ```

use std::io;

use serde::Serialize;
use thiserror::Error;

use bytesize::ByteSize;

use crate::duplicates::DuplicateReport;

/// Header row, in column order.
pub const HEADER: [&str; 5] = ["group", "key", "path", "size", "size_human"];

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group: usize,
    key: &'a str,
    path: String,
    size: u64,
    size_human: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a DuplicateReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a DuplicateReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(HEADER)?;

        for (idx, (key, set)) in self.report.iter().enumerate() {
            let size_human = ByteSize::b(set.size).to_string();
            for file in &set.files {
                csv_writer.serialize(CsvRow {
                    group: idx + 1,
                    key,
                    path: file.path.to_string_lossy().into_owned(),
                    size: file.size,
                    size_human: size_human.clone(),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
