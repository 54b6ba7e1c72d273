//! Run reports: delimited text, header row, one row per work item.
//!
//! Rows are written and flushed one at a time so a crashed or interrupted run
//! still leaves every finished row on disk; a copy report doubles as resume
//! input for the next run.

mod status;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub use status::StatusLog;

/// Terminal state of one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Succeeded,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Succeeded => write!(f, "Succeeded"),
            Status::Failed => write!(f, "Failed"),
        }
    }
}

/// Status plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub reason: String,
}

impl Outcome {
    pub fn succeeded(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Succeeded,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }
}

/// A row type the sweep can write and tally.
pub trait ReportRow: Serialize {
    /// Column names, in serialization order.
    const HEADERS: &'static [&'static str];

    fn succeeded(&self) -> bool;

    /// Bytes this row accounts for in the running totals.
    fn bytes(&self) -> u64 {
        0
    }
}

/// Streaming writer for report rows of type `R`.
pub struct ReportWriter<R, W: Write = File> {
    inner: csv::Writer<W>,
    path: Option<PathBuf>,
    rows: usize,
    _row: PhantomData<R>,
}

impl<R: ReportRow> ReportWriter<R, File> {
    /// Create the report file and write the header. Failure here aborts the run.
    pub fn create(path: &Path, delimiter: u8) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report dir {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("create report {}", path.display()))?;
        let mut writer = Self::from_writer(file, delimiter)?;
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<R: ReportRow, W: Write> ReportWriter<R, W> {
    /// Wrap any writer; the header is written immediately.
    pub fn from_writer(w: W, delimiter: u8) -> Result<Self> {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(w);
        inner.write_record(R::HEADERS).context("write report header")?;
        inner.flush().context("flush report header")?;
        Ok(Self {
            inner,
            path: None,
            rows: 0,
            _row: PhantomData,
        })
    }

    /// Append one row and flush it to the underlying writer.
    pub fn write(&mut self, row: &R) -> Result<()> {
        self.inner.serialize(row).context("write report row")?;
        self.inner.flush().context("flush report row")?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush report: {}", e.error()))
    }
}

/// Read every row of a previously written report.
pub fn read_rows<T: DeserializeOwned>(path: &Path, delimiter: u8) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("open previous report {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<T>().enumerate() {
        let row: T = row.with_context(|| format!("row {} of {}", i + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Local timestamp used in generated file names, e.g. `20240131-174502`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// `<dir>/<prefix><timestamp>.<ext>`
pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}{}.{}", prefix, timestamp(), ext))
}
