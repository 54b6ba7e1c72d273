//! `dval indexd`: resolve IndexD GUIDs and download their files.

use std::path::Path;

use anyhow::{bail, Result};
use dval_core::config::DvalConfig;
use dval_core::http::HttpClient;
use dval_core::logging::LogContext;
use dval_core::manifest::Manifest;
use dval_core::report::{timestamped_path, ReportWriter, StatusLog};
use dval_core::validators::indexd::{validate_indexd, IndexdChecker, IndexdRow, GUID, REPORT_PREFIX, STATUS_FILE, URL};

use super::print_artifacts;

pub fn run_indexd(cfg: &DvalConfig, log: &LogContext, file: &Path, base_url: Option<&str>) -> Result<()> {
    let manifest = Manifest::read_tsv(file)?;
    for column in [GUID, URL] {
        if !manifest.has_column(column) {
            bail!("manifest {} has no {} column", file.display(), column);
        }
    }
    let base = base_url.unwrap_or(&cfg.indexd_base_url);
    tracing::info!("IndexD endpoint: {}", base);

    let http = HttpClient::new(&cfg.http);
    let checker = IndexdChecker::new(&http, base, &cfg.output_dir);
    let report_path = timestamped_path(&cfg.output_dir, &format!("{}-", REPORT_PREFIX), "csv");
    let mut report = ReportWriter::<IndexdRow>::create(&report_path, b',')?;
    let mut status = StatusLog::open(&cfg.output_dir.join(STATUS_FILE))?;

    println!("Starting File Processing...");
    let progress = validate_indexd(&manifest.rows, &checker, &mut report, &mut status, cfg.progress_every)?;
    if progress.failed == 0 {
        println!("File Processing Complete!");
    } else {
        println!(
            "File Processing finished with {} failed GUIDs. See {} for details.",
            progress.failed,
            status.path().display()
        );
    }
    print_artifacts(&report_path, log);
    Ok(())
}
