//! `dval match-manifest`: validate a MATCH file manifest.

use std::path::Path;

use anyhow::{bail, Result};
use dval_core::config::DvalConfig;
use dval_core::http::HttpClient;
use dval_core::logging::LogContext;
use dval_core::manifest::Manifest;
use dval_core::report::{timestamped_path, ReportWriter};
use dval_core::store::Buckets;
use dval_core::validators::match_manifest::{
    validate_manifest, ManifestCheckRow, ManifestValidator, FILE_NAME, FILE_TYPE, MD5, PSN,
    REPORT_PREFIX,
};

use super::{match_client, print_artifacts};

pub fn run_match_manifest(cfg: &DvalConfig, log: &LogContext, manifest: &Path, check_storage: bool) -> Result<()> {
    let (mut client, cipher) = match_client(cfg)?;
    let rows = Manifest::read_tsv(manifest)?;
    for column in [FILE_NAME, MD5, PSN, FILE_TYPE] {
        if !rows.has_column(column) {
            bail!("manifest {} has no {} column", manifest.display(), column);
        }
    }

    let mut buckets = if check_storage {
        Some(Buckets::new(&cfg.storage, HttpClient::new(&cfg.http))?)
    } else {
        None
    };
    let mut validator = ManifestValidator::new(&mut client, cipher, buckets.as_mut());

    let report_path = timestamped_path(&cfg.output_dir, &format!("{}-", REPORT_PREFIX), "csv");
    let mut report = ReportWriter::<ManifestCheckRow>::create(&report_path, b',')?;
    let summary = validate_manifest(&rows.rows, &mut validator, &mut report, cfg.progress_every)?;

    print_artifacts(&report_path, log);
    println!(
        "{} files validated for {} patients: {} passed, {} failed",
        summary.progress.processed, summary.patients, summary.progress.succeeded, summary.progress.failed
    );
    if !summary.count_problems.is_empty() {
        println!("Patient file count failed ({} problems, see log)", summary.count_problems.len());
    }
    Ok(())
}
