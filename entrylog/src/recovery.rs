//! Index recovery at log open.
//!
//! Recovery reconstructs the last assigned index from persisted state before
//! a reopened log accepts any append. The persisted anchor is a segment
//! property carrying the last index checkpointed for that segment; because a
//! crash can seal a segment without checkpointing it, the property alone may
//! under-count. Recovery therefore scans forward from the newest
//! checkpointed segment, re-decoding entry headers, and advances the result
//! to the maximum index actually written.

use bytes::Bytes;
use common::{Position, SegmentedLog};

use crate::codec::{self, EntryMetadata};
use crate::error::{Error, Result};

/// Segment property key carrying the last index assigned as of that segment.
pub const INDEX_PROPERTY: &str = "index";

/// Reconstructs the last assigned index from segment properties and entry
/// headers.
///
/// Runs once, synchronously, before the reopened log instance accepts
/// appends. Returns `None` when the log has no index history: no segment
/// carries the checkpoint property and no entry has a decodable index.
///
/// # Errors
///
/// Returns [`Error::Recovery`] if a checkpoint property is present but
/// structurally corrupt. This is fatal to opening the log; silently
/// defaulting to zero would hand out already-used indices.
pub async fn recover_last_index(log: &dyn SegmentedLog) -> Result<Option<u64>> {
    let segments = log.segments().await?;

    // Newest checkpoint wins. The scan starts at that segment's first entry
    // rather than after it, so a mid-segment checkpoint is verified against
    // the entries appended behind it as well.
    let mut recovered: Option<u64> = None;
    let mut scan_from = Position::default();
    for segment in segments.iter().rev() {
        if let Some(value) = segment.properties.get(INDEX_PROPERTY) {
            let index = decode_property(segment.id, value)?;
            recovered = Some(index);
            scan_from = Position::new(segment.id, 0);
            tracing::debug!(segment = segment.id, index, "found index checkpoint");
            break;
        }
    }

    let mut reader = log.open_reader(scan_from).await?;
    while let Some((position, bytes)) = reader.next().await? {
        match EntryMetadata::decode(&bytes) {
            Some((meta, _)) => {
                if let Some(index) = meta.index {
                    if recovered.is_none_or(|r| index > r) {
                        recovered = Some(index);
                    }
                }
            }
            None => {
                tracing::debug!(%position, "entry without metadata header during recovery");
            }
        }
    }

    match recovered {
        Some(index) => tracing::info!(index, "recovered last assigned index"),
        None => tracing::info!("no index history found, log starts fresh"),
    }
    Ok(recovered)
}

fn decode_property(segment_id: u64, value: &Bytes) -> Result<u64> {
    codec::decode_index_property(value).map_err(|e| {
        Error::Recovery(format!(
            "segment {} carries a corrupt index checkpoint: {}",
            segment_id, e
        ))
    })
}
