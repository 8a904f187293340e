//! Position search by logical index.
//!
//! Finds the earliest entry whose index reaches a target, in two stages:
//! segment-level pruning over per-segment index ranges, then a binary search
//! over entry ids inside the single candidate segment. Both stages decode
//! only entry headers, never payloads, so each probe has bounded cost.
//!
//! Index monotonicity is what makes the binary search valid: the decoded
//! index sequence over positions is non-decreasing, so the predicate
//! "index below target" is true for a prefix of the log and false for the
//! rest. Entries written before metadata was enabled have no header and
//! compare as index 0, which keeps the sequence non-decreasing and the
//! search deterministic.

use common::{Position, SegmentInfo, SegmentedLog};

use crate::codec::EntryMetadata;
use crate::error::{Error, Result};

/// Finds the earliest position whose entry's decoded index is not less than
/// `target_index`.
///
/// Every entry strictly before the returned position has an index below the
/// target; the entry at the returned position (if one exists) does not. A
/// target beyond the maximum assigned index yields the position immediately
/// after the last entry rather than an error; on an empty log that is the
/// position the first entry would occupy.
pub async fn find_position(log: &dyn SegmentedLog, target_index: u64) -> Result<Position> {
    let segments: Vec<SegmentInfo> = log
        .segments()
        .await?
        .into_iter()
        .filter(|s| s.entry_count > 0)
        .collect();

    let Some(last_segment) = segments.last() else {
        return Ok(Position::default());
    };
    let end_of_log = Position::new(last_segment.id, last_segment.entry_count);

    // Segment-level pruning: binary search for the first segment whose last
    // entry reaches the target. Only last-entry headers are decoded here;
    // earlier segments are never scanned.
    let (mut lo, mut hi) = (0usize, segments.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let segment = &segments[mid];
        // Non-empty by the filter above.
        let last_position = segment.last_position().unwrap();
        if entry_index_at(log, last_position).await? < target_index {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let Some(segment) = segments.get(lo) else {
        return Ok(end_of_log);
    };

    // Entry-level search within the candidate segment. The segment's last
    // entry is known to reach the target, so the search converges on an
    // existing entry.
    let (mut lo, mut hi) = (0u64, segment.entry_count - 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if entry_index_at(log, Position::new(segment.id, mid)).await? < target_index {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(Position::new(segment.id, lo))
}

/// Decodes the index of the entry at `position`.
///
/// An entry without a decodable header (written before metadata was
/// enabled) compares as index 0; the search never aborts because of one.
async fn entry_index_at(log: &dyn SegmentedLog, position: Position) -> Result<u64> {
    let bytes = log.read_entry(position).await?.ok_or_else(|| {
        Error::Log(common::LogError::Internal(format!(
            "entry {} vanished during position search",
            position
        )))
    })?;
    match EntryMetadata::decode(&bytes).and_then(|(meta, _)| meta.index) {
        Some(index) => Ok(index),
        None => {
            tracing::debug!(%position, "entry without index during search, comparing as 0");
            Ok(0)
        }
    }
}
