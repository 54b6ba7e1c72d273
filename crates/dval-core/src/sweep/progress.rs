//! Running totals for a sweep (items, bytes, rate, ETA).
//!
//! Observational only: nothing in the sweep branches on these numbers.

/// Snapshot of sweep progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepProgress {
    /// Items in the sweep.
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Bytes accounted for by succeeded rows.
    pub bytes_validated: u64,
    /// Seconds since the sweep started.
    pub elapsed_secs: f64,
}

impl SweepProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, succeeded: bool, bytes: u64, elapsed_secs: f64) {
        self.processed += 1;
        if succeeded {
            self.succeeded += 1;
            self.bytes_validated += bytes;
        } else {
            self.failed += 1;
        }
        self.elapsed_secs = elapsed_secs;
    }

    /// Items per second (0 if elapsed is 0).
    pub fn items_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / self.elapsed_secs
    }

    /// Validated bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_validated as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None while no rate is known).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total.saturating_sub(self.processed);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.items_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    pub(crate) fn log(&self, label: &str) {
        tracing::info!(
            sweep = label,
            processed = self.processed,
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            bytes_validated = self.bytes_validated,
            bytes_per_sec = format!("{:.0}", self.bytes_per_sec()),
            elapsed_secs = format!("{:.1}", self.elapsed_secs),
            eta_secs = self.eta_secs().map(|s| format!("{:.0}", s)).unwrap_or_else(|| "-".into()),
            "progress"
        );
    }
}
