//! IndexD download check: every GUID must resolve to a signed URL that can be
//! downloaded in full.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CheckError;
use crate::http::HttpClient;
use crate::location::basename;
use crate::manifest::ManifestRow;
use crate::report::{Outcome, ReportRow, ReportWriter, Status, StatusLog};
use crate::sweep::{run_sweep, SweepProgress};

pub const GUID: &str = "GUID";
pub const URL: &str = "url";
pub const REPORT_PREFIX: &str = "indexd-validation";
pub const STATUS_FILE: &str = "status.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexdRow {
    pub guid: String,
    pub file_name: String,
    pub bytes: u64,
    pub result: Status,
    pub reason: String,
}

impl ReportRow for IndexdRow {
    const HEADERS: &'static [&'static str] = &["guid", "file_name", "bytes", "result", "reason"];

    fn succeeded(&self) -> bool {
        self.result == Status::Succeeded
    }

    fn bytes(&self) -> u64 {
        self.bytes
    }
}

#[derive(Deserialize)]
struct Resolved {
    url: String,
}

pub struct IndexdChecker<'a> {
    http: &'a HttpClient,
    base_url: String,
    scratch: PathBuf,
}

impl<'a> IndexdChecker<'a> {
    /// `base_url` is used as a plain prefix; the GUID is appended verbatim.
    pub fn new(http: &'a HttpClient, base_url: &str, scratch: &Path) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            scratch: scratch.to_path_buf(),
        }
    }

    pub fn check(&self, row: &ManifestRow, status: &mut StatusLog) -> IndexdRow {
        let guid = row.get_opt(GUID).unwrap_or("").to_string();
        let file_name = row.get_opt(URL).and_then(basename).unwrap_or_default();
        match self.fetch(row, &file_name) {
            Ok(bytes) => {
                status.line(&format!("Validating File: {}", file_name));
                IndexdRow {
                    guid,
                    file_name,
                    bytes,
                    result: Status::Succeeded,
                    reason: "downloaded".to_string(),
                }
            }
            Err(e) => {
                tracing::error!(guid = %guid, "{:#}", e);
                status.line(&format!("****GUID: {} has an error ****", guid));
                let outcome = Outcome::failed(format!("{:#}", e));
                IndexdRow {
                    guid,
                    file_name,
                    bytes: 0,
                    result: outcome.status,
                    reason: outcome.reason,
                }
            }
        }
    }

    fn fetch(&self, row: &ManifestRow, file_name: &str) -> Result<u64> {
        let guid = row.get(GUID)?;
        if file_name.is_empty() {
            return Err(CheckError::MalformedInput(format!(
                "row {}: no file name in {}",
                row.index + 1,
                URL
            ))
            .into());
        }
        let resolver = format!("{}{}", self.base_url, guid);
        let resolved: Resolved = self
            .http
            .get_json(&resolver)
            .with_context(|| format!("resolve {}", guid))?;
        tracing::info!(guid, file = file_name, "validating file");

        std::fs::create_dir_all(&self.scratch)
            .with_context(|| format!("create scratch dir {}", self.scratch.display()))?;
        let dir = tempfile::Builder::new()
            .prefix("indexd-")
            .tempdir_in(&self.scratch)
            .context("create temp dir")?;
        let path = dir.path().join(file_name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        let bytes = self
            .http
            .get_into(&resolved.url, &mut out)
            .with_context(|| format!("download {}", file_name))?;
        out.flush().context("flush download")?;
        Ok(bytes)
    }
}

pub fn validate_indexd<W: Write>(
    rows: &[ManifestRow],
    checker: &IndexdChecker<'_>,
    report: &mut ReportWriter<IndexdRow, W>,
    status: &mut StatusLog,
    progress_every: usize,
) -> Result<SweepProgress> {
    status.line(&format!("****Starting File Processing at {}******", crate::report::timestamp()));
    let progress = run_sweep(
        "indexd",
        rows.iter().collect(),
        report,
        |row: &ManifestRow| checker.check(row, status),
        progress_every,
    )?;
    if progress.failed == 0 {
        status.line(&format!("****File Processing Complete at {}****", crate::report::timestamp()));
    } else {
        status.line(&format!(
            "****File Processing Finished at {} with {} failed GUIDs****",
            crate::report::timestamp(),
            progress.failed
        ));
    }
    Ok(progress)
}
