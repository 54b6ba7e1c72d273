//! `dval integrity`: download manifest files and verify size and MD5.

use std::path::Path;

use anyhow::{bail, Result};
use dval_core::config::DvalConfig;
use dval_core::http::HttpClient;
use dval_core::logging::LogContext;
use dval_core::manifest::Manifest;
use dval_core::report::{timestamped_path, ReportWriter, StatusLog};
use dval_core::store::Buckets;
use dval_core::validators::integrity::{validate_integrity, IntegrityChecker, IntegrityRow, LOCATION, MD5, SIZE};

use super::print_artifacts;

pub fn run_integrity(
    cfg: &DvalConfig,
    log: &LogContext,
    file: &Path,
    start_row: i64,
    num_rows: Option<usize>,
    block_size: Option<usize>,
) -> Result<()> {
    let manifest = Manifest::read_tsv(file)?;
    for column in [LOCATION, MD5, SIZE] {
        if !manifest.has_column(column) {
            bail!("manifest {} has no {} column", file.display(), column);
        }
    }
    let rows = manifest.window(start_row, num_rows);
    let block = block_size.unwrap_or(cfg.integrity_block_bytes);
    println!("Block Size {}", block);

    let http = HttpClient::new(&cfg.http);
    let mut buckets = Buckets::new(&cfg.storage, http.clone())?;
    let mut checker = IntegrityChecker::new(&mut buckets, &http, &cfg.output_dir, block);

    let report_path = timestamped_path(&cfg.output_dir, "result_", "tsv");
    let status_path = timestamped_path(&cfg.output_dir, "status_", "txt");
    let mut report = ReportWriter::<IntegrityRow>::create(&report_path, b'\t')?;
    let mut status = StatusLog::open(&status_path)?;
    let progress = validate_integrity(rows, &mut checker, &mut report, &mut status, cfg.progress_every)?;

    print_artifacts(&report_path, log);
    println!("Status file is at: {}", status.path().display());
    println!(
        "{} files processed: {} passed, {} failed",
        progress.processed, progress.succeeded, progress.failed
    );
    Ok(())
}
