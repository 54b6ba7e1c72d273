//! Delimited manifests with a header row (TSV from data loaders, CSV reports).
//!
//! Rows are kept as loose header → value maps so a row missing a column only
//! fails that row (`MalformedInput`) instead of the whole read.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::CheckError;

/// One data row of a manifest.
#[derive(Debug, Clone)]
pub struct ManifestRow {
    /// 0-based position among data rows (header excluded).
    pub index: usize,
    fields: HashMap<String, String>,
}

impl ManifestRow {
    pub fn from_pairs<'a>(index: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            index,
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Required, non-empty column value.
    pub fn get(&self, column: &str) -> Result<&str, CheckError> {
        match self.fields.get(column).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CheckError::MalformedInput(format!(
                "row {}: missing {}",
                self.index + 1,
                column
            ))),
        }
    }

    /// Optional column value; empty counts as absent.
    pub fn get_opt(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required column parsed as an unsigned integer.
    pub fn get_u64(&self, column: &str) -> Result<u64, CheckError> {
        let raw = self.get(column)?;
        raw.parse::<u64>().map_err(|_| {
            CheckError::MalformedInput(format!(
                "row {}: {} is not a size: {:?}",
                self.index + 1,
                column,
                raw
            ))
        })
    }
}

/// A manifest read fully into memory; row counts are in the thousands at most.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Read a manifest with the given delimiter. Failing to open or decode the
    /// file is fatal for the run; short or long rows are kept and fail later.
    pub fn read(path: &Path, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open manifest {}", path.display()))?;
        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("read header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("read row {} of {}", index + 1, path.display()))?;
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            rows.push(ManifestRow { index, fields });
        }
        tracing::debug!(path = %path.display(), rows = rows.len(), "manifest loaded");
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Read a tab-separated manifest.
    pub fn read_tsv(path: &Path) -> Result<Self> {
        Self::read(path, b'\t')
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Rows `[start, start + count)`, capped at the end. A negative start is
    /// treated as 0; `None` means "to the end".
    pub fn window(&self, start: i64, count: Option<usize>) -> &[ManifestRow] {
        let start = usize::try_from(start.max(0)).unwrap_or(0).min(self.rows.len());
        let end = match count {
            Some(n) => start.saturating_add(n).min(self.rows.len()),
            None => self.rows.len(),
        };
        &self.rows[start..end]
    }
}
