//! Copy validation: every object under a source prefix must exist at the same
//! key in the destination bucket with identical content.
//!
//! The work list comes either from a live listing of the source or from a
//! previous report. Rows that succeeded before are replayed as-is; failed
//! rows are checked again. Order always follows the listing or the report.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compare::{ObjectPair, Strategy};
use crate::error::CheckError;
use crate::location::S3Location;
use crate::report::{read_rows, Outcome, ReportRow, ReportWriter, Status};
use crate::store::{Buckets, ObjectInfo};
use crate::sweep::{run_sweep, SweepProgress};

pub const REPORT_PREFIX: &str = "copy-file-validation";

/// Appended to the reason of rows carried over from an earlier report.
pub const PREVIOUS_RUN_NOTE: &str = " (validated in a previous run)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRow {
    pub src_bucket: String,
    pub dest_bucket: String,
    pub file_name: String,
    pub file_size: u64,
    pub result: Status,
    pub reason: String,
}

impl ReportRow for CopyRow {
    const HEADERS: &'static [&'static str] = &[
        "src_bucket",
        "dest_bucket",
        "file_name",
        "file_size",
        "result",
        "reason",
    ];

    fn succeeded(&self) -> bool {
        self.result == Status::Succeeded
    }

    fn bytes(&self) -> u64 {
        self.file_size
    }
}

/// One unit of copy-validation work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyWork {
    /// Compare `key` in both buckets. `source` is the listing entry when the
    /// work came from a live listing; `known_size` is reported if the source
    /// can no longer be read.
    Check {
        src_bucket: String,
        dest_bucket: String,
        key: String,
        source: Option<ObjectInfo>,
        known_size: u64,
    },
    /// Already validated; written back without any store access.
    Replay(CopyRow),
}

/// Work list from a live listing of `src` (bucket plus key prefix).
pub fn plan_from_listing(
    buckets: &mut Buckets,
    src: &S3Location,
    dest_bucket: &str,
) -> Result<Vec<CopyWork>> {
    let store = buckets
        .get(&src.bucket)
        .with_context(|| format!("open source bucket {}", src.bucket))?;
    let objects = store
        .list(&src.key)
        .with_context(|| format!("list {}", src))?;
    tracing::info!(source = %src, dest_bucket, objects = objects.len(), "files to compare");
    Ok(objects
        .into_iter()
        .map(|o| CopyWork::Check {
            src_bucket: src.bucket.clone(),
            dest_bucket: dest_bucket.to_string(),
            key: o.key.clone(),
            known_size: o.size,
            source: Some(o),
        })
        .collect())
}

/// Work list from a previous copy report. Failure to read it is fatal.
pub fn plan_from_previous(path: &Path) -> Result<Vec<CopyWork>> {
    let rows: Vec<CopyRow> = read_rows(path, b',')
        .with_context(|| format!("read previous report {}", path.display()))?;
    Ok(plan_resume(rows))
}

/// Split prior rows into replays (succeeded) and re-checks (failed), keeping order.
pub fn plan_resume(rows: Vec<CopyRow>) -> Vec<CopyWork> {
    let total = rows.len();
    let work: Vec<CopyWork> = rows
        .into_iter()
        .map(|row| match row.result {
            Status::Succeeded => {
                let mut row = row;
                if !row.reason.ends_with(PREVIOUS_RUN_NOTE) {
                    row.reason.push_str(PREVIOUS_RUN_NOTE);
                }
                CopyWork::Replay(row)
            }
            Status::Failed => CopyWork::Check {
                src_bucket: row.src_bucket,
                dest_bucket: row.dest_bucket,
                key: row.file_name,
                source: None,
                known_size: row.file_size,
            },
        })
        .collect();
    let replays = work.iter().filter(|w| matches!(w, CopyWork::Replay(_))).count();
    tracing::info!(rows = total, replays, rechecks = total - replays, "resuming from previous report");
    work
}

/// Checks single work items against the configured stores.
pub struct CopyChecker<'a> {
    buckets: &'a mut Buckets,
    strategy: &'a Strategy,
}

impl<'a> CopyChecker<'a> {
    pub fn new(buckets: &'a mut Buckets, strategy: &'a Strategy) -> Self {
        Self { buckets, strategy }
    }

    pub fn check(&mut self, work: CopyWork) -> CopyRow {
        match work {
            CopyWork::Replay(row) => {
                tracing::debug!(key = %row.file_name, "validated in a previous run");
                row
            }
            CopyWork::Check {
                src_bucket,
                dest_bucket,
                key,
                source,
                known_size,
            } => {
                tracing::info!(key = %key, "validating file");
                let (size, outcome) =
                    match self.compare(&src_bucket, &dest_bucket, &key, source) {
                        Ok((size, outcome)) => (size, outcome),
                        Err(e) => (known_size, Outcome::failed(e.to_string())),
                    };
                tracing::info!(key = %key, result = %outcome.status, reason = %outcome.reason, "validated");
                CopyRow {
                    src_bucket,
                    dest_bucket,
                    file_name: key,
                    file_size: size,
                    result: outcome.status,
                    reason: outcome.reason,
                }
            }
        }
    }

    /// Destination first: a missing copy fails before the source is touched.
    fn compare(
        &mut self,
        src_bucket: &str,
        dest_bucket: &str,
        key: &str,
        source: Option<ObjectInfo>,
    ) -> Result<(u64, Outcome), CheckError> {
        let dest_store = self.buckets.get(dest_bucket)?;
        let src_store = self.buckets.get(src_bucket)?;
        let dest = dest_store.head(key)?;
        let source = match source {
            Some(info) => info,
            None => src_store.head(key)?,
        };
        let outcome = self.strategy.evaluate(&ObjectPair {
            source: &source,
            dest: &dest,
            source_store: src_store.as_ref(),
            dest_store: dest_store.as_ref(),
        });
        Ok((source.size, outcome))
    }
}

/// Result of a copy validation sweep.
#[derive(Debug, Clone)]
pub struct CopySummary {
    pub progress: SweepProgress,
    /// Keys whose row failed, in report order.
    pub failed_keys: Vec<String>,
}

pub fn validate_copy<W: Write>(
    work: Vec<CopyWork>,
    buckets: &mut Buckets,
    strategy: &Strategy,
    report: &mut ReportWriter<CopyRow, W>,
    progress_every: usize,
) -> Result<CopySummary> {
    let mut checker = CopyChecker::new(buckets, strategy);
    let mut failed_keys = Vec::new();
    let progress = run_sweep(
        "copy",
        work,
        report,
        |w| {
            let row = checker.check(w);
            if !row.succeeded() {
                failed_keys.push(row.file_name.clone());
            }
            row
        },
        progress_every,
    )?;
    tracing::info!("comparing finished");
    Ok(CopySummary {
        progress,
        failed_keys,
    })
}
