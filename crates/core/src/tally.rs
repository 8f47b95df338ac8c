//! Per-frame object tally and its CSV report.
//!
//! One report per detection pass. The file is truncated when the pass
//! starts, gets a fixed header row, then one `frame,object,count` row per
//! distinct class seen in each frame.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

/// Header row of every report.
pub const REPORT_HEADER: [&str; 3] = ["Frame", "Object", "Count"];

/// Counts of detections keyed by class label, for a single frame.
///
/// A `BTreeMap` so rows for one frame always come out in the same
/// (alphabetical) order.
pub type FrameTally = BTreeMap<String, u32>;

/// Count occurrences of each label.
pub fn count_labels<I, S>(labels: I) -> FrameTally
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tally = FrameTally::new();
    for label in labels {
        *tally.entry(label.into()).or_insert(0) += 1;
    }
    tally
}

/// Report filename for a calendar date: `objects_count_{d}-{m}-{yyyy}.csv`
/// with unpadded day and month.
///
/// ```
/// use chrono::NaiveDate;
/// use vidtally_core::tally::report_file_name;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// assert_eq!(report_file_name(date), "objects_count_7-3-2024.csv");
/// ```
pub fn report_file_name(date: NaiveDate) -> String {
    format!(
        "objects_count_{}-{}-{}.csv",
        date.day(),
        date.month(),
        date.year()
    )
}

/// Writer for one detection pass's report.
pub struct TallyWriter {
    path: PathBuf,
    out: BufWriter<File>,
    rows: usize,
}

impl TallyWriter {
    /// Create (or truncate) the report at `path` and write the header row.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", REPORT_HEADER.join(","))?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
            rows: 0,
        })
    }

    /// Append one row per class in `tally`. Zero counts are skipped so
    /// every written count is positive.
    pub fn write_frame(&mut self, frame_name: &str, tally: &FrameTally) -> std::io::Result<()> {
        let frame = csv_escape(frame_name);
        for (label, &count) in tally {
            if count == 0 {
                continue;
            }
            writeln!(self.out, "{frame},{},{count}", csv_escape(label))?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered rows to disk and return the report path.
    pub fn finish(mut self) -> std::io::Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}

/// Escape a value for CSV: wrap in quotes if it contains comma, quote, or newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
