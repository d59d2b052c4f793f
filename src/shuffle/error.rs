use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a shuffle run.
///
/// Output goes to a staging file next to the output path and is renamed into
/// place only on success, so after any of these errors the output path holds
/// whatever it held before the run.
#[derive(Error, Debug)]
pub enum ShuffleError {
    #[error("Failed to open input file {path}: {source}")]
    OpenInput { path: PathBuf, source: io::Error },

    #[error("Failed to create output file {path}: {source}")]
    CreateOutput { path: PathBuf, source: io::Error },

    #[error("Failed to count lines in {path}: {source}")]
    Count { path: PathBuf, source: io::Error },

    #[error("Worker {index} failed: {source}")]
    Worker { index: usize, source: io::Error },

    #[error("Worker {index} panicked or was aborted")]
    WorkerPanicked { index: usize },

    #[error("Failed to flush output: {source}")]
    Flush { source: io::Error },

    #[error("Failed to move finished output into {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },

    #[error("Shuffle cancelled before completion")]
    Cancelled,

    #[error("Shuffle exceeded its deadline of {seconds}s")]
    DeadlineExceeded { seconds: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ShuffleError {
    /// True for the two ways a run can be stopped from outside
    pub fn is_interruption(&self) -> bool {
        matches!(self, ShuffleError::Cancelled | ShuffleError::DeadlineExceeded { .. })
    }
}

pub type ShuffleResult<T> = std::result::Result<T, ShuffleError>;
