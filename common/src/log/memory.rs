//! In-memory segmented log.
//!
//! [`InMemoryLog`] is the reference implementation of [`SegmentedLog`]. It
//! rolls segments over by entry count: when the active segment reaches
//! `max_entries_per_segment`, it is sealed and the next append starts a new
//! segment. State lives entirely in memory, so "reopening" a log instance
//! over the same `Arc` models a process restart against durable storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::{LogError, LogResult};
use crate::log::{EntryReader, Position, SegmentId, SegmentInfo, SegmentedLog};

struct MemorySegment {
    id: SegmentId,
    entries: Vec<Bytes>,
    sealed: bool,
    properties: HashMap<String, Bytes>,
}

impl MemorySegment {
    fn new(id: SegmentId) -> Self {
        Self {
            id,
            entries: Vec::new(),
            sealed: false,
            properties: HashMap::new(),
        }
    }

    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            id: self.id,
            entry_count: self.entries.len() as u64,
            sealed: self.sealed,
            properties: self.properties.clone(),
        }
    }
}

/// An in-memory [`SegmentedLog`] with entry-count based rollover.
pub struct InMemoryLog {
    segments: RwLock<Vec<MemorySegment>>,
    max_entries_per_segment: usize,
}

impl InMemoryLog {
    /// Creates an empty log that rolls segments over after
    /// `max_entries_per_segment` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries_per_segment` is zero.
    pub fn new(max_entries_per_segment: usize) -> Self {
        assert!(
            max_entries_per_segment > 0,
            "max_entries_per_segment must be at least 1"
        );
        Self {
            segments: RwLock::new(Vec::new()),
            max_entries_per_segment,
        }
    }

    /// Creates an empty log wrapped in an `Arc`, ready to share.
    pub fn shared(max_entries_per_segment: usize) -> Arc<Self> {
        Arc::new(Self::new(max_entries_per_segment))
    }
}

#[async_trait]
impl SegmentedLog for InMemoryLog {
    async fn append(&self, entry: Bytes) -> LogResult<Position> {
        let mut segments = self.segments.write().await;

        let needs_rollover = match segments.last() {
            None => true,
            Some(seg) => seg.sealed || seg.entries.len() >= self.max_entries_per_segment,
        };
        if needs_rollover {
            let next_id = match segments.last_mut() {
                Some(seg) => {
                    seg.sealed = true;
                    seg.id + 1
                }
                None => 0,
            };
            tracing::debug!(segment = next_id, "rolling over to new segment");
            segments.push(MemorySegment::new(next_id));
        }

        // Unwrap is safe: a segment was just pushed if none existed.
        let segment = segments.last_mut().unwrap();
        segment.entries.push(entry);
        Ok(Position::new(segment.id, segment.entries.len() as u64 - 1))
    }

    async fn open_reader(&self, start: Position) -> LogResult<Box<dyn EntryReader>> {
        let segments = self.segments.read().await;

        // Snapshot everything from `start` onward. Bytes are refcounted, so
        // this copies handles, not payloads.
        let mut entries = Vec::new();
        for segment in segments.iter() {
            for (i, bytes) in segment.entries.iter().enumerate() {
                let position = Position::new(segment.id, i as u64);
                if position >= start {
                    entries.push((position, bytes.clone()));
                }
            }
        }

        Ok(Box::new(InMemoryReader { entries, next: 0 }))
    }

    async fn segments(&self) -> LogResult<Vec<SegmentInfo>> {
        let segments = self.segments.read().await;
        Ok(segments.iter().map(|s| s.info()).collect())
    }

    async fn write_segment_property(
        &self,
        segment_id: SegmentId,
        key: &str,
        value: Bytes,
    ) -> LogResult<()> {
        let mut segments = self.segments.write().await;
        let segment = segments
            .iter_mut()
            .find(|s| s.id == segment_id)
            .ok_or(LogError::SegmentNotFound(segment_id))?;
        segment.properties.insert(key.to_string(), value);
        Ok(())
    }
}

struct InMemoryReader {
    entries: Vec<(Position, Bytes)>,
    next: usize,
}

#[async_trait]
impl EntryReader for InMemoryReader {
    async fn next(&mut self) -> LogResult<Option<(Position, Bytes)>> {
        let item = self.entries.get(self.next).cloned();
        if item.is_some() {
            self.next += 1;
        }
        Ok(item)
    }
}
