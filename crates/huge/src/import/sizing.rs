use crate::Error;

/// Largest number of nodes a single import worker may own.
pub const MAX_BATCH_SIZE: u64 = 2_000_000_000;

/// Splits the dense id space into power-of-two sized ranges, one per import
/// worker.
///
/// Since the range size is a power of two, the worker owning a node is
/// found by a single shift.
///
/// ```
/// use huge_graph::import::ThreadSizing;
///
/// let sizing = ThreadSizing::new(4, 100).unwrap();
///
/// assert_eq!(sizing.batch_size(), 32);
/// assert_eq!(sizing.worker_count(), 4);
/// assert_eq!(sizing.worker(31), 0);
/// assert_eq!(sizing.worker(99), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSizing {
    threads: usize,
    node_count: u64,
    batch_size: u64,
    shift: u32,
}

impl ThreadSizing {
    /// Computes the sizing for `node_count` nodes and the requested
    /// `concurrency`.
    ///
    /// Fails if the node ranges would become too large even when using every
    /// available thread.
    pub fn new(concurrency: usize, node_count: u64) -> Result<Self, Error> {
        let available = num_cpus::get().max(concurrency);
        Self::determine(node_count, available, concurrency, MAX_BATCH_SIZE)
    }

    pub(crate) fn determine(
        node_count: u64,
        available: usize,
        concurrency: usize,
        max_batch_size: u64,
    ) -> Result<Self, Error> {
        // every worker must run at the same time, otherwise the scanner can
        // block on a queue whose worker has not been started yet
        let mut threads = concurrency.min(available).max(1);

        loop {
            let batch_size = ceil_div(node_count, threads as u64).max(1).next_power_of_two();

            if batch_size > max_batch_size {
                let needed = ((node_count / max_batch_size) as usize).max(threads + 1);
                if needed > available {
                    return Err(Error::NotEnoughThreads {
                        threads: available,
                        node_count,
                        batch_size,
                    });
                }
                threads = needed;
                continue;
            }

            if threads as u64 > max_batch_size {
                return Err(Error::TooManyThreads {
                    node_count,
                    threads,
                });
            }

            return Ok(Self {
                threads,
                node_count,
                batch_size,
                shift: batch_size.trailing_zeros(),
            });
        }
    }

    /// Number of threads the sizing was computed for.
    pub fn thread_count(&self) -> usize {
        self.threads
    }

    /// Number of workers that actually own nodes.
    ///
    /// This may be smaller than [`Self::thread_count`] for small graphs.
    pub fn worker_count(&self) -> usize {
        ceil_div(self.node_count, self.batch_size) as usize
    }

    /// Number of nodes per worker range.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// `log2` of the batch size.
    pub fn range_shift(&self) -> u32 {
        self.shift
    }

    /// The worker owning `node`.
    #[inline]
    pub fn worker(&self, node: u64) -> usize {
        (node >> self.shift) as usize
    }

    /// First node of the range owned by `worker`.
    #[inline]
    pub fn range_start(&self, worker: usize) -> u64 {
        (worker as u64) << self.shift
    }

    /// Number of nodes owned by `worker`.
    pub fn range_len(&self, worker: usize) -> usize {
        let start = self.range_start(worker);
        self.batch_size.min(self.node_count.saturating_sub(start)) as usize
    }
}

fn ceil_div(dividend: u64, divisor: u64) -> u64 {
    dividend / divisor + u64::from(dividend % divisor != 0)
}
