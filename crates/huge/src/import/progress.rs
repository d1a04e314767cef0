use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use num_format::{Locale, ToFormattedString};

/// Shared counter of relationship records processed by the import workers.
///
/// If the expected number of records is known, progress is logged whenever
/// another 10% have been processed.
#[derive(Debug)]
pub struct ImportProgress {
    expected: u64,
    processed: AtomicU64,
}

impl ImportProgress {
    pub fn new(expected: u64) -> Self {
        Self {
            expected,
            processed: AtomicU64::new(0),
        }
    }

    /// Adds `count` processed records.
    pub fn records_processed(&self, count: u64) {
        let before = self.processed.fetch_add(count, Ordering::Relaxed);
        if self.expected == 0 {
            return;
        }

        let after = before + count;
        let step_before = before * 10 / self.expected;
        let step_after = after * 10 / self.expected;
        if step_after > step_before {
            info!(
                "Import: {}% ({} records)",
                (step_after * 10).min(100),
                after.to_formatted_string(&Locale::en)
            );
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_concurrently() {
        let progress = ImportProgress::new(4000);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| (0..1000).for_each(|_| progress.records_processed(1)));
            }
        });

        assert_eq!(progress.processed(), 4000);
    }

    #[test]
    fn unknown_total() {
        let progress = ImportProgress::new(0);
        progress.records_processed(42);

        assert_eq!(progress.processed(), 42);
        assert_eq!(progress.expected(), 0);
    }
}
