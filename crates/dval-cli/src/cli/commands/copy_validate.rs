//! `dval copy-validate` and `dval bucket-compare`: storage copy validation.

use std::path::Path;

use anyhow::{Context, Result};
use dval_core::compare::Strategy;
use dval_core::config::{remove_trailing_slash, DvalConfig};
use dval_core::http::HttpClient;
use dval_core::location::S3Location;
use dval_core::logging::LogContext;
use dval_core::report::{timestamped_path, ReportWriter};
use dval_core::store::Buckets;
use dval_core::validators::copy::{
    plan_from_listing, plan_from_previous, validate_copy, CopyRow, CopySummary, CopyWork,
    REPORT_PREFIX,
};

use super::print_artifacts;

fn open_buckets(cfg: &DvalConfig) -> Result<Buckets> {
    let http = HttpClient::new(&cfg.http).with_buffer_size(cfg.digest_chunk_bytes);
    Buckets::new(&cfg.storage, http)
}

fn sweep(
    cfg: &DvalConfig,
    log: &LogContext,
    buckets: &mut Buckets,
    work: Vec<CopyWork>,
    strategy: &Strategy,
) -> Result<CopySummary> {
    let path = timestamped_path(&cfg.output_dir, &format!("{}-", REPORT_PREFIX), "csv");
    let mut report = ReportWriter::<CopyRow>::create(&path, b',')?;
    tracing::info!(stages = ?strategy.stage_names(), "comparing {} files", work.len());
    let summary = validate_copy(work, buckets, strategy, &mut report, cfg.progress_every)?;
    print_artifacts(&path, log);
    println!(
        "{} files compared: {} succeeded, {} failed",
        summary.progress.processed, summary.progress.succeeded, summary.progress.failed
    );
    Ok(summary)
}

pub fn run_copy_validate(
    cfg: &DvalConfig,
    log: &LogContext,
    src_path: Option<&str>,
    dest_bucket: Option<&str>,
    previous_file: Option<&Path>,
    tags_only: bool,
) -> Result<()> {
    let mut buckets = open_buckets(cfg)?;
    let work = match previous_file {
        Some(prev) => {
            if src_path.is_some() || dest_bucket.is_some() {
                tracing::warn!("--previous-file given; buckets are taken from the previous report");
            }
            tracing::info!("Previous report: {}", prev.display());
            plan_from_previous(prev)?
        }
        None => {
            let src = S3Location::parse(src_path.context("--src-path is required")?)?;
            let dest = remove_trailing_slash(dest_bucket.context("--dest-bucket is required")?);
            tracing::info!("Source bucket: {}", src.bucket);
            tracing::info!("Dest   bucket: {}", dest);
            tracing::info!("Prefix: {}", src.key);
            plan_from_listing(&mut buckets, &src, dest)?
        }
    };
    let strategy = if tags_only {
        Strategy::tags_only()
    } else {
        Strategy::tiered(cfg.digest_algorithm, cfg.digest_chunk_bytes)
    };
    sweep(cfg, log, &mut buckets, work, &strategy)?;
    Ok(())
}

/// Tag-only comparison of two whole buckets; lists the keys that differ.
pub fn run_bucket_compare(
    cfg: &DvalConfig,
    log: &LogContext,
    source_bucket: &str,
    dest_bucket: &str,
) -> Result<()> {
    let mut buckets = open_buckets(cfg)?;
    let src = S3Location {
        bucket: remove_trailing_slash(source_bucket).to_string(),
        key: String::new(),
    };
    let work = plan_from_listing(&mut buckets, &src, remove_trailing_slash(dest_bucket))?;
    let summary = sweep(cfg, log, &mut buckets, work, &Strategy::tags_only())?;
    if summary.failed_keys.is_empty() {
        println!("All tags match");
    } else {
        println!("Objects whose tags differ or are missing:");
        for key in &summary.failed_keys {
            println!("  {}", key);
        }
    }
    Ok(())
}
