//! The underlying segmented log abstraction.
//!
//! This module defines the surface the indexing engine consumes: an
//! append-only log of immutable entries, physically grouped into segments
//! that roll over and seal as the log grows. The engine never allocates
//! segments itself; everything it needs is expressed by [`SegmentedLog`].
//!
//! # Addressing
//!
//! Every entry is identified by a [`Position`]: the id of the segment it
//! lives in and its entry id within that segment. Segment ids increase
//! monotonically on rollover; entry ids restart at 0 in each segment.
//!
//! # Visibility
//!
//! Implementations must guarantee that an entry is either fully visible to
//! readers or not visible at all. Readers and appends may run concurrently.

pub mod config;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LogResult;

/// Unique identifier for a segment, monotonically increasing on rollover.
pub type SegmentId = u64;

/// Identifier of an entry within a segment, restarting at 0 per segment.
pub type EntryId = u64;

/// The location of a physical entry in the log.
///
/// Positions order lexicographically: first by segment id, then by entry id.
/// This matches the order entries were appended in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// The segment the entry lives in.
    pub segment_id: SegmentId,
    /// The entry's id within its segment.
    pub entry_id: EntryId,
}

impl Position {
    /// Creates a new position.
    pub fn new(segment_id: SegmentId, entry_id: EntryId) -> Self {
        Self {
            segment_id,
            entry_id,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.segment_id, self.entry_id)
    }
}

/// Descriptor of one segment of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// The segment's unique identifier.
    pub id: SegmentId,
    /// Number of entries stored in the segment.
    pub entry_count: u64,
    /// Whether the segment has been sealed (no further appends).
    pub sealed: bool,
    /// Persisted key/value metadata attached to the segment.
    pub properties: HashMap<String, Bytes>,
}

impl SegmentInfo {
    /// Returns the position of the segment's first entry, if it has any.
    pub fn first_position(&self) -> Option<Position> {
        (self.entry_count > 0).then(|| Position::new(self.id, 0))
    }

    /// Returns the position of the segment's last entry, if it has any.
    pub fn last_position(&self) -> Option<Position> {
        (self.entry_count > 0).then(|| Position::new(self.id, self.entry_count - 1))
    }
}

/// Iterator over entries of a [`SegmentedLog`].
///
/// Yields `(position, bytes)` pairs in position order, crossing segment
/// boundaries transparently.
#[async_trait]
pub trait EntryReader: Send {
    /// Returns the next entry, or `None` when the log is exhausted.
    async fn next(&mut self) -> LogResult<Option<(Position, Bytes)>>;
}

/// An append-only, segmented, ordered log of immutable entries.
///
/// This is the storage collaborator of the indexing engine. Implementations
/// own segment allocation, rollover, and durability of raw bytes; the
/// engine layers metadata semantics on top.
#[async_trait]
pub trait SegmentedLog: Send + Sync {
    /// Appends an entry and returns the position it was stored at.
    ///
    /// Appends are totally ordered: the returned positions of successive
    /// calls are strictly increasing.
    async fn append(&self, entry: Bytes) -> LogResult<Position>;

    /// Opens a reader yielding entries with positions `>= start`.
    ///
    /// A `start` pointing past the end of the log produces an immediately
    /// exhausted reader, not an error.
    async fn open_reader(&self, start: Position) -> LogResult<Box<dyn EntryReader>>;

    /// Returns descriptors for all segments, ordered by segment id.
    ///
    /// The last descriptor is the active (unsealed) segment when the log is
    /// non-empty.
    async fn segments(&self) -> LogResult<Vec<SegmentInfo>>;

    /// Attaches a key/value property to a segment, overwriting any previous
    /// value for the key.
    async fn write_segment_property(
        &self,
        segment_id: SegmentId,
        key: &str,
        value: Bytes,
    ) -> LogResult<()>;

    /// Returns descriptors for sealed segments only, ordered by segment id.
    async fn sealed_segments(&self) -> LogResult<Vec<SegmentInfo>> {
        Ok(self
            .segments()
            .await?
            .into_iter()
            .filter(|s| s.sealed)
            .collect())
    }

    /// Reads the entry stored at exactly `position`.
    ///
    /// Returns `None` if no entry exists at that position.
    async fn read_entry(&self, position: Position) -> LogResult<Option<Bytes>> {
        let mut reader = self.open_reader(position).await?;
        match reader.next().await? {
            Some((pos, bytes)) if pos == position => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }
}
