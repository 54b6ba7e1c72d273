//! The linear sweep shared by every validator: one check per item, one report
//! row per item, in input order, each row flushed before the next item starts.

mod progress;

use std::io::Write;
use std::time::Instant;

use anyhow::Result;

use crate::report::{ReportRow, ReportWriter};

pub use progress::SweepProgress;

/// Run `check` over `items`, writing every returned row to `report`.
///
/// `check` is infallible by contract: per-item failures are expressed as
/// failed rows. Only a report write error aborts the sweep. Progress is logged
/// every `progress_every` items (0 disables periodic lines) and at the end.
pub fn run_sweep<T, R, W, F>(
    label: &str,
    items: Vec<T>,
    report: &mut ReportWriter<R, W>,
    mut check: F,
    progress_every: usize,
) -> Result<SweepProgress>
where
    R: ReportRow,
    W: Write,
    F: FnMut(T) -> R,
{
    let started = Instant::now();
    let mut progress = SweepProgress::new(items.len());
    tracing::info!(sweep = label, items = items.len(), "sweep started");

    for item in items {
        let row = check(item);
        report.write(&row)?;
        progress.record(row.succeeded(), row.bytes(), started.elapsed().as_secs_f64());
        if progress_every > 0 && progress.processed % progress_every == 0 && !progress.is_complete() {
            progress.log(label);
        }
    }

    progress.elapsed_secs = started.elapsed().as_secs_f64();
    progress.log(label);
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    struct Row {
        item: u32,
        ok: bool,
    }

    impl ReportRow for Row {
        const HEADERS: &'static [&'static str] = &["item", "ok"];

        fn succeeded(&self) -> bool {
            self.ok
        }

        fn bytes(&self) -> u64 {
            10
        }
    }

    #[test]
    fn one_row_per_item_in_order() {
        let mut report: ReportWriter<Row, Vec<u8>> = ReportWriter::from_writer(Vec::new(), b',').unwrap();
        let progress = run_sweep(
            "test",
            vec![3, 1, 2, 4],
            &mut report,
            |n| Row { item: n, ok: n % 2 == 0 },
            1,
        )
        .unwrap();
        assert_eq!(progress.processed, 4);
        assert_eq!(progress.succeeded, 2);
        assert_eq!(progress.failed, 2);
        assert_eq!(progress.bytes_validated, 20);
        assert_eq!(report.rows_written(), 4);
        let text = String::from_utf8(report.into_inner().unwrap()).unwrap();
        assert_eq!(text, "item,ok\n3,false\n1,false\n2,true\n4,true\n");
    }

    #[test]
    fn empty_sweep_writes_header_only() {
        let mut report: ReportWriter<Row, Vec<u8>> = ReportWriter::from_writer(Vec::new(), b',').unwrap();
        let progress = run_sweep("empty", Vec::<u32>::new(), &mut report, |n| Row { item: n, ok: true }, 0).unwrap();
        assert_eq!(progress.processed, 0);
        let text = String::from_utf8(report.into_inner().unwrap()).unwrap();
        assert_eq!(text, "item,ok\n");
    }
}
