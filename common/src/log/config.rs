//! Segmented log configuration and factory.

use std::sync::Arc;

use crate::log::memory::InMemoryLog;
use crate::log::SegmentedLog;

/// Configuration for the in-memory log backend.
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Number of entries after which the active segment is sealed and a new
    /// one is started.
    pub max_entries_per_segment: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_segment: 1024,
        }
    }
}

/// Selects and configures a segmented log backend.
#[derive(Debug, Clone)]
pub enum LogConfig {
    /// In-memory backend, primarily for tests and local tooling.
    InMemory(InMemoryConfig),
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::InMemory(InMemoryConfig::default())
    }
}

/// Creates a segmented log for the given configuration.
pub fn create_log(config: &LogConfig) -> Arc<dyn SegmentedLog> {
    match config {
        LogConfig::InMemory(cfg) => Arc::new(InMemoryLog::new(cfg.max_entries_per_segment)),
    }
}
