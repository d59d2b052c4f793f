pub const MAX_WORKERS: usize = 1024;
pub const LINE_TERMINATOR: u8 = b'\n';

pub const LINE_COUNT_BUFFER_SIZE: usize = 64 * 1024;

pub const DEFAULT_JITTER_MICROS: u64 = 1;
pub const MAX_JITTER_MICROS: u64 = 10_000;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 1;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 64 * 1024;

pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 60.0;
pub const MIN_MEMORY_USAGE_PERCENT: f64 = 10.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "fscram.json";
pub const STAGING_SUFFIX: &str = ".fscram-partial";

// Ceiling on a single jitter sleep, whatever the worker's scale factor
pub const MAX_JITTER_SLEEP_MICROS: u64 = 50_000;

pub const SHUTDOWN_CHECK_INTERVAL_MS: u64 = 200;
