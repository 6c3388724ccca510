//! Output formatters for duplicate scan results.
//!
//! This module provides the report formats:
//! - CSV for spreadsheet import and scripting
//! - A tree view for reading in a terminal
//!
//! Both render an empty report: a header-only CSV, or a single
//! "No duplicate files found." line.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::{DuplicateFinder, FinderConfig};
//! use dupefind::output::CsvOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
//! let (report, _summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! CsvOutput::new(&report).write_to(std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod tree;

pub use csv::{CsvOutput, CsvOutputError};
pub use tree::TreeOutput;
