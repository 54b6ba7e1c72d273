//! `dval match-metadata`: validate CTDC case metadata against MATCH.

use anyhow::{Context, Result};
use dval_core::config::DvalConfig;
use dval_core::http::HttpClient;
use dval_core::logging::LogContext;
use dval_core::match_api::fetch_case_overview;
use dval_core::report::{timestamped_path, ReportWriter};
use dval_core::validators::match_metadata::{
    validate_metadata, ArmRoster, MetadataRow, MetadataValidator, REPORT_PREFIX,
};

use super::{match_client, print_artifacts};

pub fn run_match_metadata(cfg: &DvalConfig, log: &LogContext) -> Result<()> {
    let mcfg = cfg.match_config()?;
    let (mut client, cipher) = match_client(cfg)?;
    let roster = ArmRoster::load(&client, &mcfg.arms)?;

    let cases = fetch_case_overview(&HttpClient::new(&cfg.http), &mcfg.api_url)
        .with_context(|| format!("Could NOT retrieve CTDC data at {}", mcfg.api_url))?;

    let report_path = timestamped_path(&cfg.output_dir, &format!("{}_", REPORT_PREFIX), "csv");
    let mut report = ReportWriter::<MetadataRow>::create(&report_path, b',')?;
    tracing::info!("Validation result file: {}", report_path.display());
    let mut validator = MetadataValidator::new(&mut client, cipher, &roster);
    let summary = validate_metadata(cases, &mut validator, &mut report, cfg.progress_every)?;

    print_artifacts(&report_path, log);
    println!(
        "Cases processed: {}, validation succeeded: {} ({:.2} seconds)",
        summary.progress.processed, summary.progress.succeeded, summary.running_secs
    );
    if !summary.count_problems.is_empty() {
        println!("Validate patient count failed ({} problems, see log)", summary.count_problems.len());
    }
    Ok(())
}
