// Shuffle engine: line counting, pool sizing, synchronized handles, workers
pub mod shuffle;

// Byte and time units shared by the engine and the binary
pub mod constants;

// Logging setup and formatting helpers
pub mod utils;

// Re-export main types for convenience
pub use shuffle::{shuffle_file, ShuffleConfig, ShuffleCoordinator, ShuffleError, ShuffleMode, ShuffleStats};
