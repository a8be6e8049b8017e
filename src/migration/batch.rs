// src/migration/batch.rs
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use crate::errors::ServerError;

#[derive(Debug, Clone, PartialEq)]
pub struct FailedBatch {
    pub index: usize,
    pub records: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub batches: usize,
    pub records_written: usize,
    pub failed: Vec<FailedBatch>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes `records` in sequential chunks of `batch_size`, sleeping `delay`
/// between chunks. A chunk whose write fails is logged and skipped; the
/// remaining chunks still run and earlier ones stay committed.
pub fn run_batches<T, F>(records: &[T], batch_size: usize, delay: Duration, mut write: F) -> MigrationReport
where
    F: FnMut(usize, &[T]) -> Result<usize, ServerError>,
{
    let mut report = MigrationReport::default();
    let size = batch_size.max(1);
    let total = records.len().div_ceil(size);

    for (index, chunk) in records.chunks(size).enumerate() {
        if index > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        report.batches += 1;

        match write(index, chunk) {
            Ok(n) => {
                report.records_written += n;
                info!(batch = index + 1, total, records = n, "batch written");
            }
            Err(e) => {
                error!(batch = index + 1, total, "batch failed, skipping: {e}");
                report.failed.push(FailedBatch {
                    index,
                    records: chunk.len(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        batches = report.batches,
        written = report.records_written,
        failed = report.failed.len(),
        "migration finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_middle_batch_does_not_stop_or_undo_the_others() {
        let records: Vec<u32> = (1..=6).collect();
        let mut attempted = Vec::new();
        let mut committed: Vec<u32> = Vec::new();

        let report = run_batches(&records, 2, Duration::ZERO, |index, chunk| {
            attempted.push(index);
            if index == 1 {
                return Err(ServerError::DbError("constraint failed".to_string()));
            }
            committed.extend_from_slice(chunk);
            Ok(chunk.len())
        });

        assert_eq!(attempted, vec![0, 1, 2]);
        assert_eq!(committed, vec![1, 2, 5, 6]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.records_written, 4);
        assert_eq!(
            report.failed,
            vec![FailedBatch {
                index: 1,
                records: 2,
                error: "Database Error: constraint failed".to_string(),
            }]
        );
    }

    #[test]
    fn zero_batch_size_is_treated_as_one() {
        let report = run_batches(&[1, 2, 3], 0, Duration::ZERO, |_, c| Ok(c.len()));
        assert_eq!(report.batches, 3);
        assert!(report.is_clean());
    }

    #[test]
    fn nothing_to_write() {
        let report = run_batches::<u8, _>(&[], 50, Duration::from_secs(5), |_, c| Ok(c.len()));
        assert_eq!(report, MigrationReport::default());
    }
}
