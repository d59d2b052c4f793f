pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod handles;
pub mod line_counter;
pub mod permutation;
pub mod sizer;
pub mod staging;
pub mod worker;


pub use config::{ShuffleConfig, ShuffleMode};
pub use coordinator::ShuffleCoordinator;
pub use error::{ShuffleError, ShuffleResult};
pub use line_counter::{count_lines, tally_lines, LineTally};
pub use sizer::{size, size_with_limit, PoolSize};

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleStats {
    pub line_count: usize,
    pub lines_read: usize,
    pub lines_written: usize,
    pub workers_spawned: usize,
    pub quota: usize,
    /// Seed behind the slot permutation and the worker jitter
    pub seed: u64,
    pub mode: ShuffleMode,
    pub processing_time_ms: u64,
}

impl Default for ShuffleStats {
    fn default() -> Self {
        Self {
            line_count: 0,
            lines_read: 0,
            lines_written: 0,
            workers_spawned: 0,
            quota: 0,
            seed: 0,
            mode: ShuffleMode::Permuted,
            processing_time_ms: 0,
        }
    }
}

pub async fn shuffle_file(
    input: &Path,
    output: &Path,
    config: ShuffleConfig,
) -> ShuffleResult<ShuffleStats> {
    let coordinator = ShuffleCoordinator::new(config)?;
    coordinator.shuffle(input, output).await
}
