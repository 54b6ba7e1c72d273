//! Logging init: one log file per run under the XDG state dir, or stderr.
//!
//! The returned `LogContext` is created once in `main`, handed to commands that
//! want to point the operator at the log file, and finished before exit.

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// Handle for the process-wide log sink.
pub struct LogContext {
    app: String,
    path: Option<PathBuf>,
    file: Option<fs::File>,
}

impl LogContext {
    /// Log file of this run, if logging goes to a file.
    pub fn log_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush the log file to disk. Call once at exit.
    pub fn finish(self) {
        tracing::debug!(app = %self.app, "closing log");
        if let Some(f) = &self.file {
            if let Err(e) = f.sync_all() {
                tracing::warn!(error = %e, "failed to sync log file");
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dval=debug"))
}

/// Initialize structured logging to `~/.local/state/dval/<app>-<timestamp>.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(app: &str) -> Result<LogContext> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dval")?;
    let log_dir = xdg_dirs.get_state_home();

    fs::create_dir_all(&log_dir)?;
    let log_file_path = log_dir.join(log_file_name(app, &crate::report::timestamp()));

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;
    let flush_handle = file.try_clone()?;

    struct FileMakeWriter(std::fs::File);

    impl<'a> MakeWriter<'a> for FileMakeWriter {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!("{} logging initialized at {}", app, log_file_path.display());

    Ok(LogContext {
        app: app.to_string(),
        path: Some(log_file_path),
        file: Some(flush_handle),
    })
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr(app: &str) -> LogContext {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    LogContext {
        app: app.to_string(),
        path: None,
        file: None,
    }
}

fn log_file_name(app: &str, stamp: &str) -> String {
    let app: String = app
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-{}.log", app, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_sanitizes_app() {
        assert_eq!(
            log_file_name("copy-validate", "20240101-120000"),
            "copy-validate-20240101-120000.log"
        );
        assert_eq!(log_file_name("a/b c", "x"), "a_b_c-x.log");
    }

    #[test]
    fn finish_syncs_file_and_stderr_only_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"line\n").unwrap();
        let ctx = LogContext {
            app: "run".into(),
            path: Some(path.clone()),
            file: Some(file),
        };
        assert_eq!(ctx.log_file(), Some(path.as_path()));
        ctx.finish();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line\n");

        LogContext { app: "run".into(), path: None, file: None }.finish();
    }
}
