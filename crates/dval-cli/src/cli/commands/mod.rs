//! CLI command handlers, one file per validator.

mod checksum;
mod copy_validate;
mod indexd;
mod integrity;
mod match_manifest;
mod match_metadata;
mod pick_files;

use std::path::Path;

use anyhow::Result;
use dval_core::config::DvalConfig;
use dval_core::http::HttpClient;
use dval_core::logging::LogContext;
use dval_core::match_api::{MatchClient, SimpleCipher};

pub use checksum::run_checksum;
pub use copy_validate::{run_bucket_compare, run_copy_validate};
pub use indexd::run_indexd;
pub use integrity::run_integrity;
pub use match_manifest::run_match_manifest;
pub use match_metadata::run_match_metadata;
pub use pick_files::run_pick_files;

/// Tell the operator where the run's artifacts are.
fn print_artifacts(report: &Path, log: &LogContext) {
    println!("Output file is at: {}", report.display());
    tracing::info!("Output file is at: {}", report.display());
    if let Some(file) = log.log_file() {
        println!("Log file is at: {}", file.display());
    }
}

/// MATCH client, cipher and configured arms from the `[match]` section.
fn match_client(cfg: &DvalConfig) -> Result<(MatchClient, SimpleCipher)> {
    let mcfg = cfg.match_config()?;
    if mcfg.use_prod {
        tracing::info!("Using Match Production Environment");
    } else {
        tracing::info!("Using Match UAT Environment");
    }
    let token = mcfg.token()?;
    let client = MatchClient::new(mcfg.base_url(), &token, HttpClient::new(&cfg.http));
    Ok((client, SimpleCipher::new(mcfg.cipher_key)))
}
