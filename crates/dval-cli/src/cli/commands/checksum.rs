//! Checksum command: digest a local file.

use anyhow::Result;
use dval_core::checksum::{self, DigestAlgorithm};
use std::path::Path;

/// Compute and print the digest of the given file.
pub fn run_checksum(path: &Path, algorithm: DigestAlgorithm) -> Result<()> {
    let digest = checksum::digest_path(algorithm, path, checksum::BUF_SIZE)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
