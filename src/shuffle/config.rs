use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::path::Path;
use crate::constants::PERCENT_100;
use crate::shuffle::constants::*;
use crate::shuffle::error::ShuffleError;

/// How the final line order is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    /// Lines land on slots chosen by a seeded permutation
    Permuted,
    /// Lines are appended in whatever order workers reach the writer
    Interleaved,
}

impl std::str::FromStr for ShuffleMode {
    type Err = ShuffleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permuted" => Ok(ShuffleMode::Permuted),
            "interleaved" => Ok(ShuffleMode::Interleaved),
            other => Err(ShuffleError::InvalidConfig(format!(
                "unknown shuffle mode '{}', expected 'permuted' or 'interleaved'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuffleConfig {
    pub mode: ShuffleMode,
    pub seed: Option<u64>,
    pub max_workers: usize,
    pub jitter_micros: u64,
    pub io_buffer_size_kb: usize,
    pub memory_usage_percent: f64,
    pub deadline_seconds: Option<u64>,
    pub verbose: bool,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            mode: ShuffleMode::Permuted,
            seed: None,
            max_workers: MAX_WORKERS,
            jitter_micros: DEFAULT_JITTER_MICROS,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            deadline_seconds: None,
            verbose: false,
        }
    }
}

impl ShuffleConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ShuffleError> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS {
            return Err(ShuffleError::InvalidConfig(format!(
                "max_workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }

        if self.jitter_micros > MAX_JITTER_MICROS {
            return Err(ShuffleError::InvalidConfig(format!(
                "jitter_micros cannot exceed {}",
                MAX_JITTER_MICROS
            )));
        }

        if self.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.io_buffer_size_kb > MAX_IO_BUFFER_SIZE_KB {
            return Err(ShuffleError::InvalidConfig(format!(
                "io_buffer_size_kb must be between {} and {}",
                MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
            )));
        }

        if self.memory_usage_percent < MIN_MEMORY_USAGE_PERCENT
            || self.memory_usage_percent > MAX_MEMORY_USAGE_PERCENT {
            return Err(ShuffleError::InvalidConfig(format!(
                "memory_usage_percent must be between {} and {}",
                MIN_MEMORY_USAGE_PERCENT, MAX_MEMORY_USAGE_PERCENT
            )));
        }

        if self.deadline_seconds == Some(0) {
            return Err(ShuffleError::InvalidConfig(
                "deadline_seconds must be positive when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * crate::constants::BYTES_PER_KB
    }

    /// Bytes of RAM the buffered lines may occupy before a warning is logged
    pub fn memory_limit_bytes(&self) -> u64 {
        use sysinfo::System;
        let mut system = System::new();
        system.refresh_memory();

        let available = system.available_memory() as f64;
        (available * self.memory_usage_percent / PERCENT_100) as u64
    }
}
