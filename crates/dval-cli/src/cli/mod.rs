//! CLI for the DVAL data-migration validators.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dval_core::checksum::DigestAlgorithm;
use dval_core::config;
use dval_core::logging::LogContext;
use std::path::PathBuf;

use commands::{
    run_bucket_compare, run_checksum, run_copy_validate, run_indexd, run_integrity,
    run_match_manifest, run_match_metadata, run_pick_files,
};

/// Top-level CLI for the DVAL validators.
#[derive(Debug, Parser)]
#[command(name = "dval")]
#[command(about = "DVAL: data-migration validation for storage copies, manifests and MATCH metadata", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/dval/config.toml, created if missing).
    #[arg(long, global = true, alias = "config-file", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Validate that every object under a source path was copied to a destination bucket.
    CopyValidate {
        /// Source bucket and optional prefix, e.g. s3://bucket/some/path.
        #[arg(long, value_name = "S3_PATH", required_unless_present = "previous_file")]
        src_path: Option<String>,
        /// Destination bucket name.
        #[arg(long, value_name = "BUCKET", required_unless_present = "previous_file")]
        dest_bucket: Option<String>,
        /// Resume from an earlier copy report: succeeded rows are kept, failed rows re-checked.
        #[arg(long, value_name = "REPORT")]
        previous_file: Option<PathBuf>,
        /// Compare integrity tags only (no size or content checks).
        #[arg(long)]
        tags_only: bool,
    },

    /// Compare integrity tags of every object in one bucket against another.
    BucketCompare {
        /// Source bucket name.
        #[arg(long, alias = "source_bucket")]
        source_bucket: String,
        /// Destination bucket name.
        #[arg(long, alias = "dest_bucket")]
        dest_bucket: String,
    },

    /// Download manifest files and verify their size and MD5.
    Integrity {
        /// Manifest TSV with file_location, md5sum and file_size columns.
        #[arg(long)]
        file: PathBuf,
        /// First (0-based) row to process; negative values start at 0.
        #[arg(long, alias = "start_row", default_value_t = 0, allow_negative_numbers = true)]
        start_row: i64,
        /// Number of rows to process (default: to the end of the manifest).
        #[arg(long, alias = "num_rows")]
        num_rows: Option<usize>,
        /// Block size in bytes for MD5 calculation.
        #[arg(long, visible_alias = "md5-blocksize", value_name = "BYTES")]
        block_size: Option<usize>,
    },

    /// Resolve IndexD GUIDs and download every file they point to.
    Indexd {
        /// Manifest TSV with GUID and url columns.
        #[arg(long)]
        file: PathBuf,
        /// Download endpoint the GUID is appended to (overrides config).
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Validate a MATCH file manifest against the MATCH API.
    MatchManifest {
        /// Manifest TSV to validate.
        manifest: PathBuf,
        /// Also check existence and MD5 of each file_locations object in storage.
        #[arg(long)]
        check_storage: bool,
    },

    /// Validate CTDC case metadata against MATCH.
    MatchMetadata,

    /// Copy files whose names contain a case's patient id.
    PickFiles {
        /// Case file (TSV) with a patient_id column.
        #[arg(short = 'c', long)]
        case_file: PathBuf,
        /// Folder to copy files from.
        source: PathBuf,
        /// Folder to copy files to (created if missing).
        dest: PathBuf,
    },

    /// Compute the digest of a local file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// md5 or sha256.
        #[arg(long, default_value = "sha256")]
        algorithm: DigestAlgorithm,
    },
}

impl CliCommand {
    /// Name used for the run's log file.
    pub fn app_name(&self) -> &'static str {
        match self {
            CliCommand::CopyValidate { .. } => "File_copy_validator",
            CliCommand::BucketCompare { .. } => "Bucket_comparator",
            CliCommand::Integrity { .. } => "File_integrity_tester",
            CliCommand::Indexd { .. } => "IndexD_tester",
            CliCommand::MatchManifest { .. } => "Match_Manifest_Validator",
            CliCommand::MatchMetadata => "Match_Metadata_Validator",
            CliCommand::PickFiles { .. } => "Pick_files",
            CliCommand::Checksum { .. } => "Checksum",
        }
    }
}

impl Cli {
    pub fn run(self, log: &LogContext) -> Result<()> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::CopyValidate {
                src_path,
                dest_bucket,
                previous_file,
                tags_only,
            } => run_copy_validate(
                &cfg,
                log,
                src_path.as_deref(),
                dest_bucket.as_deref(),
                previous_file.as_deref(),
                tags_only,
            )?,
            CliCommand::BucketCompare {
                source_bucket,
                dest_bucket,
            } => run_bucket_compare(&cfg, log, &source_bucket, &dest_bucket)?,
            CliCommand::Integrity {
                file,
                start_row,
                num_rows,
                block_size,
            } => run_integrity(&cfg, log, &file, start_row, num_rows, block_size)?,
            CliCommand::Indexd { file, base_url } => {
                run_indexd(&cfg, log, &file, base_url.as_deref())?
            }
            CliCommand::MatchManifest {
                manifest,
                check_storage,
            } => run_match_manifest(&cfg, log, &manifest, check_storage)?,
            CliCommand::MatchMetadata => run_match_metadata(&cfg, log)?,
            CliCommand::PickFiles {
                case_file,
                source,
                dest,
            } => run_pick_files(&case_file, &source, &dest)?,
            CliCommand::Checksum { path, algorithm } => run_checksum(&path, algorithm)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
