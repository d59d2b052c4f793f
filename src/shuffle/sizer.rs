use crate::shuffle::constants::MAX_WORKERS;

/// Worker pool dimensions for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub worker_count: usize,
    /// Upper bound on the lines any single worker reads
    pub quota: usize,
    pub line_count: usize,
}

impl PoolSize {
    pub fn is_empty(&self) -> bool {
        self.worker_count == 0
    }

    /// Exact number of lines worker `index` (1-based) reads.
    ///
    /// The remainder of `line_count / worker_count` goes to the last workers,
    /// one extra line each, so the shares always add up to `line_count`.
    pub fn share(&self, index: usize) -> usize {
        if self.worker_count == 0 || index == 0 || index > self.worker_count {
            return 0;
        }

        let base = self.line_count / self.worker_count;
        let extra = self.line_count % self.worker_count;
        if index > self.worker_count - extra {
            base + 1
        } else {
            base
        }
    }
}

pub fn size(line_count: usize) -> PoolSize {
    size_with_limit(line_count, MAX_WORKERS)
}

pub fn size_with_limit(line_count: usize, max_workers: usize) -> PoolSize {
    let max_workers = max_workers.max(1);
    let worker_count = line_count.min(max_workers);

    let mut quota = line_count / max_workers;
    if line_count % max_workers != 0 {
        quota += 1;
    }

    PoolSize {
        worker_count,
        quota,
        line_count,
    }
}
