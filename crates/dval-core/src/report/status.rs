//! Append-only plain-text status file (progress notes for operators).

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct StatusLog {
    file: File,
    path: PathBuf,
}

impl StatusLog {
    /// Open (or create) the status file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open status file {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Status notes are best effort; a failed write is logged, not fatal.
    pub fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.file, "{}", text) {
            tracing::warn!(path = %self.path.display(), "status write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        StatusLog::open(&path).unwrap().line("first");
        StatusLog::open(&path).unwrap().line("second");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
