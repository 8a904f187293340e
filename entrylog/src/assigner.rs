//! The monotonic index assigner.
//!
//! One [`IndexAssigner`] exists per open log instance. It owns the
//! last-assigned logical index and advances it by the batch size of every
//! appended entry. The counter is seeded once by recovery before the first
//! append and destroyed with the instance; no process-wide state is kept.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::error::{Error, Result};

/// Sentinel for "no index has ever been assigned".
///
/// Keeping the counter one below the first real index makes
/// `last + batch_size` the single assignment formula: the very first entry
/// gets `batch_size - 1`, the last logical offset it consumes, zero-based.
const UNASSIGNED: i64 = -1;

/// Assigns strictly monotonically increasing logical indices to appended
/// entries.
///
/// # Concurrency
///
/// [`on_append`](IndexAssigner::on_append) must be externally serialized
/// with other `on_append` calls, in the same order the physical writes are
/// sequenced; interleaving two appends breaks monotonicity irrecoverably.
/// [`current_index`](IndexAssigner::current_index) is a lock-free snapshot
/// and may run concurrently with appends, e.g. from checkpointing or
/// position search.
#[derive(Debug)]
pub struct IndexAssigner {
    last_index: AtomicI64,
    appended: AtomicBool,
}

impl IndexAssigner {
    /// Creates an assigner that has never assigned an index.
    pub fn new() -> Self {
        Self {
            last_index: AtomicI64::new(UNASSIGNED),
            appended: AtomicBool::new(false),
        }
    }

    /// Assigns the index for one appended entry carrying `batch_size`
    /// logical messages and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `batch_size` is zero or does
    /// not fit the counter; the counter is untouched in that case.
    pub fn on_append(&self, batch_size: u64) -> Result<u64> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }
        let batch = i64::try_from(batch_size)
            .map_err(|_| Error::InvalidArgument(format!("batch size {} too large", batch_size)))?;

        let index = self.last_index.load(Ordering::Acquire) + batch;
        self.last_index.store(index, Ordering::Release);
        self.appended.store(true, Ordering::Release);
        Ok(index as u64)
    }

    /// Returns the last assigned index, or `None` if no entry has ever been
    /// assigned one (on this instance or any recovered predecessor).
    pub fn current_index(&self) -> Option<u64> {
        let last = self.last_index.load(Ordering::Acquire);
        (last > UNASSIGNED).then_some(last as u64)
    }

    /// Seeds the counter with the last index recovered from persisted state.
    ///
    /// Must be called before any append on this instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if an append has already occurred.
    pub fn seed(&self, value: u64) -> Result<()> {
        if self.appended.load(Ordering::Acquire) {
            return Err(Error::IllegalState(
                "index assigner cannot be seeded after appends have started".to_string(),
            ));
        }
        let value = i64::try_from(value)
            .map_err(|_| Error::InvalidArgument(format!("seed value {} too large", value)))?;
        self.last_index.store(value, Ordering::Release);
        Ok(())
    }
}

impl Default for IndexAssigner {
    fn default() -> Self {
        Self::new()
    }
}
