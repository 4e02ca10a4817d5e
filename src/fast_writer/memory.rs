//! Memory profiles for the streaming workbook writer

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`StreamingProfile::from_env`]
pub const MEMORY_LIMIT_ENV: &str = "TABLESTREAM_MEMORY_LIMIT_MB";

/// How many rows (and bytes) of worksheet XML are buffered before they are
/// handed to the compressor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StreamingProfile {
    /// Small containers (< 512MB): flush every 100 rows, buffer 256KB
    Low,
    /// Medium containers (512MB-1GB): flush every 500 rows, buffer 512KB
    Medium,
    /// Large containers (> 1GB): flush every 1000 rows, buffer 1MB (default)
    #[default]
    High,
    Custom {
        flush_interval: u32,
        max_buffer_size: usize,
    },
}

impl StreamingProfile {
    /// Pick a profile from a memory limit in MB
    pub fn from_memory_mb(memory_mb: usize) -> Self {
        if memory_mb < 512 {
            StreamingProfile::Low
        } else if memory_mb < 1024 {
            StreamingProfile::Medium
        } else {
            StreamingProfile::High
        }
    }

    /// Detect from `TABLESTREAM_MEMORY_LIMIT_MB`, `High` when unset or invalid
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MEMORY_LIMIT_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.trim().parse::<usize>().ok())
            .map(Self::from_memory_mb)
            .unwrap_or(StreamingProfile::High)
    }

    /// Rows between hand-offs to the compressor
    pub fn flush_interval(&self) -> u32 {
        match self {
            StreamingProfile::Low => 100,
            StreamingProfile::Medium => 500,
            StreamingProfile::High => 1000,
            StreamingProfile::Custom { flush_interval, .. } => (*flush_interval).max(1),
        }
    }

    /// Buffered bytes that force a hand-off regardless of row count
    pub fn max_buffer_size(&self) -> usize {
        match self {
            StreamingProfile::Low => 256 * 1024,
            StreamingProfile::Medium => 512 * 1024,
            StreamingProfile::High => 1024 * 1024,
            StreamingProfile::Custom {
                max_buffer_size, ..
            } => (*max_buffer_size).max(1024),
        }
    }
}
