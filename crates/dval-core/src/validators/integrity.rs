//! Manifest integrity test: download each listed file, then compare its size
//! on disk and its MD5 against the manifest.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::checksum::md5_path;
use crate::error::CheckError;
use crate::http::HttpClient;
use crate::location::S3Location;
use crate::manifest::ManifestRow;
use crate::report::{ReportRow, ReportWriter, StatusLog};
use crate::store::Buckets;
use crate::sweep::{run_sweep, SweepProgress};

pub const LOCATION: &str = "file_location";
pub const MD5: &str = "md5sum";
pub const SIZE: &str = "file_size";

pub const DEFAULT_BLOCK_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassFail {
    Pass,
    Fail,
}

impl fmt::Display for PassFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassFail::Pass => write!(f, "Pass"),
            PassFail::Fail => write!(f, "Fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityRow {
    #[serde(rename = "Files")]
    pub files: String,
    #[serde(rename = "Status")]
    pub status: PassFail,
    #[serde(rename = "Md5 Expected")]
    pub md5_expected: String,
    #[serde(rename = "Md5 Calculated")]
    pub md5_calculated: String,
    #[serde(rename = "File Size Expected")]
    pub size_expected: String,
    #[serde(rename = "File Size Calculated")]
    pub size_calculated: String,
}

impl ReportRow for IntegrityRow {
    const HEADERS: &'static [&'static str] = &[
        "Files",
        "Status",
        "Md5 Expected",
        "Md5 Calculated",
        "File Size Expected",
        "File Size Calculated",
    ];

    fn succeeded(&self) -> bool {
        self.status == PassFail::Pass
    }

    fn bytes(&self) -> u64 {
        self.size_calculated.parse().unwrap_or(0)
    }
}

/// Downloads manifest entries into scoped temp files under `scratch`.
pub struct IntegrityChecker<'a> {
    buckets: &'a mut Buckets,
    http: &'a HttpClient,
    scratch: PathBuf,
    block_size: usize,
}

struct Measured {
    md5: String,
    size: u64,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(buckets: &'a mut Buckets, http: &'a HttpClient, scratch: &Path, block_size: usize) -> Self {
        Self {
            buckets,
            http,
            scratch: scratch.to_path_buf(),
            block_size: block_size.max(1),
        }
    }

    pub fn check(&mut self, row: &ManifestRow) -> (IntegrityRow, String) {
        let location = row.get_opt(LOCATION).unwrap_or("").to_string();
        let md5_expected = row.get_opt(MD5).unwrap_or("").to_string();
        let size_expected = row.get_opt(SIZE).unwrap_or("").to_string();

        let measured = row.get(LOCATION).map_err(anyhow::Error::from).and_then(|loc| self.measure(loc));
        match measured {
            Ok(m) => {
                let pass = row.get_u64(SIZE).ok() == Some(m.size)
                    && m.md5.eq_ignore_ascii_case(&md5_expected);
                let name = file_label(&location);
                let message = if pass {
                    format!("File {} Passed", name)
                } else {
                    format!(
                        "Processing Failed on File {} with Expected MD5: {}, Calculated MD5: {} Expected FileSize {} FileSize on Disk {}",
                        name, md5_expected, m.md5, size_expected, m.size
                    )
                };
                let out = IntegrityRow {
                    files: location,
                    status: if pass { PassFail::Pass } else { PassFail::Fail },
                    md5_expected,
                    md5_calculated: m.md5,
                    size_expected,
                    size_calculated: m.size.to_string(),
                };
                (out, message)
            }
            Err(e) => {
                let message = format!("Processing Failed on File {}: {:#}", file_label(&location), e);
                let out = IntegrityRow {
                    files: location,
                    status: PassFail::Fail,
                    md5_expected,
                    md5_calculated: String::new(),
                    size_expected,
                    size_calculated: String::new(),
                };
                (out, message)
            }
        }
    }

    /// Download to a temp file (removed on drop), then size and hash it from disk.
    fn measure(&mut self, location: &str) -> Result<Measured> {
        std::fs::create_dir_all(&self.scratch)
            .with_context(|| format!("create scratch dir {}", self.scratch.display()))?;
        let tmp = tempfile::Builder::new()
            .prefix("integrity-")
            .tempfile_in(&self.scratch)
            .context("create temp file")?;
        {
            let mut out = BufWriter::new(tmp.as_file());
            tracing::info!(location, "downloading");
            self.fetch(location, &mut out)?;
            out.flush().context("flush download")?;
        }
        let size = std::fs::metadata(tmp.path())
            .with_context(|| format!("stat {}", tmp.path().display()))?
            .len();
        let md5 = md5_path(tmp.path(), self.block_size)?;
        tracing::info!(location, size, md5 = %md5, "download complete");
        Ok(Measured { md5, size })
    }

    fn fetch(&mut self, location: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return self.http.get_into(location, sink);
        }
        let loc = S3Location::parse(location)?;
        let store = self.buckets.get(&loc.bucket)?;
        store.stream(&loc.key, sink)
    }
}

fn file_label(location: &str) -> String {
    crate::location::basename(location).unwrap_or_else(|| location.to_string())
}

pub fn validate_integrity<W: Write>(
    rows: &[ManifestRow],
    checker: &mut IntegrityChecker<'_>,
    report: &mut ReportWriter<IntegrityRow, W>,
    status: &mut StatusLog,
    progress_every: usize,
) -> Result<SweepProgress> {
    let total = rows.len();
    status.line(&format!("**** Starting File Processing at {} ******", crate::report::timestamp()));
    tracing::info!(rows = total, block_size = checker.block_size, "integrity test");
    let mut count = 0usize;
    let progress = run_sweep(
        "integrity",
        rows.iter().collect(),
        report,
        |row: &ManifestRow| {
            count += 1;
            let (out, message) = checker.check(row);
            if out.status == PassFail::Pass {
                tracing::info!("{}", message);
            } else {
                tracing::error!("{}", message);
            }
            status.line(&format!("Processed File {} of {}. {}", count, total, message));
            out
        },
        progress_every,
    )?;
    status.line(&format!("**** Ended File Processing at {} ******", crate::report::timestamp()));
    Ok(progress)
}
