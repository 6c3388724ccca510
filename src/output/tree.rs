//! Tree view of duplicate sets for reading in a terminal.
//!
//! ```text
//! Group 1 (blake3:9f86d08..., 5 B each):
//! ├── /data/a.txt
//! └── /data/b.txt
//!
//! 1 group, 2 files, 5 B reclaimable
//! ```

use std::io;

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::DuplicateReport;

/// Line written for a report with no duplicate sets.
pub const EMPTY_MESSAGE: &str = "No duplicate files found.";

/// Tree output formatter.
pub struct TreeOutput<'a> {
    report: &'a DuplicateReport,
    color: bool,
}

impl<'a> TreeOutput<'a> {
    /// Create a plain-text tree formatter.
    #[must_use]
    pub fn new(report: &'a DuplicateReport) -> Self {
        Self {
            report,
            color: false,
        }
    }

    /// Enable or disable ANSI colour.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Write the tree to the given writer.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the writer.
    pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        if self.report.is_empty() {
            writeln!(writer, "{EMPTY_MESSAGE}")?;
            return writer.flush();
        }

        for (idx, (key, set)) in self.report.iter().enumerate() {
            let header = format!(
                "Group {} ({}, {} each):",
                idx + 1,
                key,
                ByteSize::b(set.size)
            );
            if self.color {
                writeln!(writer, "{}", header.bold().cyan())?;
            } else {
                writeln!(writer, "{header}")?;
            }

            let last = set.files.len().saturating_sub(1);
            for (i, file) in set.files.iter().enumerate() {
                let branch = if i == last { "└──" } else { "├──" };
                writeln!(writer, "{branch} {}", file.path.display())?;
            }
            writeln!(writer)?;
        }

        let groups = self.report.len();
        let footer = format!(
            "{} group{}, {} files, {} reclaimable",
            groups,
            if groups == 1 { "" } else { "s" },
            self.report.file_count(),
            ByteSize::b(self.report.wasted_space())
        );
        if self.color {
            writeln!(writer, "{}", footer.green())?;
        } else {
            writeln!(writer, "{footer}")?;
        }
        writer.flush()
    }

    /// Render the tree as a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
