//! Checksums over files and byte streams (MD5, SHA-256).
//!
//! Content is always consumed in fixed-size chunks so memory stays bounded
//! no matter how large the object is.

use anyhow::{Context, Result};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Default chunk size for streaming digests.
pub const BUF_SIZE: usize = 64 * 1024;

/// Hash function used for content digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Matches single-part S3 ETags and the md5sum column of manifests.
    #[default]
    Md5,
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Md5 => write!(f, "md5"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => anyhow::bail!("unknown digest algorithm: {}", other),
        }
    }
}

enum HasherState {
    Md5(Md5),
    Sha256(Sha256),
}

/// `Write` sink that hashes everything written to it.
///
/// Object stores push content into a `&mut dyn Write`; handing them a
/// `DigestSink` computes the digest incrementally without a local copy.
pub struct DigestSink {
    state: HasherState,
    bytes: u64,
}

impl DigestSink {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Md5 => HasherState::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
        };
        Self { state, bytes: 0 }
    }

    /// Number of bytes hashed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Consume the sink and return the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        match self.state {
            HasherState::Md5(h) => hex::encode(h.finalize()),
            HasherState::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

impl Write for DigestSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            HasherState::Md5(h) => h.update(buf),
            HasherState::Sha256(h) => h.update(buf),
        }
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digest everything `reader` yields, reading `block_size` bytes at a time.
/// Returns the lowercase hex digest and the number of bytes read.
pub fn digest_reader<R: Read>(
    algorithm: DigestAlgorithm,
    mut reader: R,
    block_size: usize,
) -> io::Result<(String, u64)> {
    let mut sink = DigestSink::new(algorithm);
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
    }
    let bytes = sink.bytes();
    Ok((sink.finalize_hex(), bytes))
}

/// Digest a file on disk in `block_size` chunks.
pub fn digest_path(algorithm: DigestAlgorithm, path: &Path, block_size: usize) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let (digest, _) = digest_reader(algorithm, f, block_size)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(digest)
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    digest_path(DigestAlgorithm::Sha256, path, BUF_SIZE)
}

/// Compute MD5 of a file and return the digest as lowercase hex.
pub fn md5_path(path: &Path, block_size: usize) -> Result<String> {
    digest_path(DigestAlgorithm::Md5, path, block_size)
}
