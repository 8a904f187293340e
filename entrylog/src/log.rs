//! The indexed log facade.
//!
//! [`IndexedLog`] ties the engine together around an underlying
//! [`SegmentedLog`]: it runs the contributor chain on every append, prepends
//! the encoded metadata header to the stored entry, checkpoints the index
//! counter into segment properties as segments seal, and answers index
//! queries.
//!
//! # Append path
//!
//! Appends to one instance are serialized: compute metadata, encode, write,
//! checkpoint run as one unit under a single lock. Interleaving two appends
//! would assign indices out of order with the physical write order and break
//! monotonicity irrecoverably. Reads and position searches take no lock;
//! they only observe fully written entries.

use std::sync::Arc;

use bytes::Bytes;
use common::{Clock, EntryReader, Position, SegmentId, SegmentedLog, SystemClock};
use tokio::sync::Mutex;

use crate::codec::{self, EntryMetadata};
use crate::config::Config;
use crate::contributor::ContributorChain;
use crate::error::{Error, Result};
use crate::recovery::{self, INDEX_PROPERTY};
use crate::search;
use crate::transform::PayloadTransform;

/// State owned by the append path.
struct AppendState {
    /// Segment the previous append landed in; a change means that segment
    /// was sealed underneath us and is due a checkpoint.
    active_segment: Option<SegmentId>,
}

/// A segmented log augmented with broker-assigned entry metadata.
///
/// # Example
///
/// ```ignore
/// use bytes::Bytes;
/// use common::InMemoryLog;
/// use entrylog::{Config, IndexedLog};
///
/// let log = InMemoryLog::shared(1024);
/// let indexed = IndexedLog::open(log, Config::standard()).await?;
/// let position = indexed.append(Bytes::from("payload"), 2).await?;
/// assert_eq!(indexed.current_index(), Some(1));
/// ```
pub struct IndexedLog {
    log: Arc<dyn SegmentedLog>,
    chain: ContributorChain,
    transform: Option<Arc<dyn PayloadTransform>>,
    append_state: Mutex<AppendState>,
}

impl IndexedLog {
    /// Opens an indexed log over `log`, recovering index state before any
    /// append is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recovery`] if persisted checkpoint state is corrupt;
    /// the log cannot safely accept appends in that case.
    pub async fn open(log: Arc<dyn SegmentedLog>, config: Config) -> Result<Self> {
        Self::open_inner(log, config, None, Arc::new(SystemClock)).await
    }

    /// Opens an indexed log with a payload transform installed.
    ///
    /// The transform applies to the payload portion of every entry, around
    /// the metadata header.
    pub async fn open_with_transform(
        log: Arc<dyn SegmentedLog>,
        config: Config,
        transform: Arc<dyn PayloadTransform>,
    ) -> Result<Self> {
        Self::open_inner(log, config, Some(transform), Arc::new(SystemClock)).await
    }

    /// Opens an indexed log with an explicit clock, for deterministic
    /// timestamp contributions in tests.
    pub async fn open_with_clock(
        log: Arc<dyn SegmentedLog>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::open_inner(log, config, None, clock).await
    }

    async fn open_inner(
        log: Arc<dyn SegmentedLog>,
        config: Config,
        transform: Option<Arc<dyn PayloadTransform>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let chain = ContributorChain::from_names(&config.contributors, clock);

        if let Some(assigner) = chain.index_assigner() {
            if let Some(last_index) = recovery::recover_last_index(log.as_ref()).await? {
                assigner.seed(last_index)?;
            }
        }

        let active_segment = log.segments().await?.last().map(|s| s.id);
        Ok(Self {
            log,
            chain,
            transform,
            append_state: Mutex::new(AppendState { active_segment }),
        })
    }

    /// Appends one physical entry carrying `batch_size` logical messages and
    /// returns the position it was stored at.
    ///
    /// The entry's index is the last logical offset it consumes: the
    /// previous entry's index plus `batch_size`, or `batch_size - 1` for the
    /// first indexed entry ever written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `batch_size` is zero, before
    /// any state is mutated.
    pub async fn append(&self, payload: Bytes, batch_size: u64) -> Result<Position> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut state = self.append_state.lock().await;

        // Captured before this entry advances the counter: if this append
        // rolls the log over, the sealed segment's checkpoint is the index
        // as of its own last entry.
        let sealed_index = self.current_index();

        let meta = self.chain.contribute(batch_size)?;
        let payload = match &self.transform {
            Some(transform) => transform.transform_on_write(payload),
            None => payload,
        };
        let entry = if meta.is_empty() {
            payload
        } else {
            codec::encode_entry(&meta, &payload)
        };

        let position = self.log.append(entry).await?;

        if let Some(sealed) = state.active_segment {
            if position.segment_id != sealed {
                if let Some(index) = sealed_index {
                    self.log
                        .write_segment_property(
                            sealed,
                            INDEX_PROPERTY,
                            codec::encode_index_property(index),
                        )
                        .await?;
                    tracing::debug!(segment = sealed, index, "checkpointed sealed segment");
                }
            }
        }
        state.active_segment = Some(position.segment_id);

        Ok(position)
    }

    /// Returns the last assigned index, or `None` if the index contributor
    /// is inactive or no entry has ever been assigned one.
    pub fn current_index(&self) -> Option<u64> {
        self.chain
            .index_assigner()
            .and_then(|assigner| assigner.current_index())
    }

    /// Finds the earliest position whose entry's index is not less than
    /// `target_index`.
    ///
    /// Every entry strictly before the returned position has an index below
    /// the target. A target beyond the maximum assigned index yields the
    /// position immediately after the last entry.
    pub async fn find_position(&self, target_index: u64) -> Result<Position> {
        search::find_position(self.log.as_ref(), target_index).await
    }

    /// Decodes the metadata header from a stored entry's bytes.
    ///
    /// Returns `None` for entries written before any contributor was active.
    pub fn decode_header(&self, entry: &[u8]) -> Option<EntryMetadata> {
        EntryMetadata::decode(entry).map(|(meta, _)| meta)
    }

    /// Checkpoints the current index into the active segment's properties.
    ///
    /// A no-op when no index has been assigned yet. Rollover checkpoints
    /// happen automatically on the append path; this covers the tail
    /// segment, typically right before [`close`](IndexedLog::close).
    pub async fn checkpoint(&self) -> Result<()> {
        let state = self.append_state.lock().await;
        let (Some(segment), Some(index)) = (state.active_segment, self.current_index()) else {
            return Ok(());
        };
        self.log
            .write_segment_property(segment, INDEX_PROPERTY, codec::encode_index_property(index))
            .await?;
        tracing::debug!(segment, index, "checkpointed active segment");
        Ok(())
    }

    /// Closes the instance, checkpointing the active segment.
    ///
    /// The underlying log is left untouched; reopening it with
    /// [`open`](IndexedLog::open) resumes index assignment where this
    /// instance stopped.
    pub async fn close(self) -> Result<()> {
        self.checkpoint().await
    }

    /// Opens a reader over stored entries, starting at `start`.
    ///
    /// Decodes each entry's header and applies the payload transform's read
    /// side, if one is installed.
    pub async fn open_reader(&self, start: Position) -> Result<IndexedReader> {
        Ok(IndexedReader {
            inner: self.log.open_reader(start).await?,
            transform: self.transform.clone(),
        })
    }
}

/// An entry read back from an [`IndexedLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Where the entry is stored.
    pub position: Position,
    /// The decoded metadata header; `None` for entries written before any
    /// contributor was active.
    pub metadata: Option<EntryMetadata>,
    /// The original payload, with the read side of the payload transform
    /// applied.
    pub payload: Bytes,
}

/// Iterator over [`IndexedEntry`] values in position order.
pub struct IndexedReader {
    inner: Box<dyn EntryReader>,
    transform: Option<Arc<dyn PayloadTransform>>,
}

impl IndexedReader {
    /// Returns the next entry, or `None` when the log is exhausted.
    pub async fn next(&mut self) -> Result<Option<IndexedEntry>> {
        let Some((position, bytes)) = self.inner.next().await? else {
            return Ok(None);
        };
        let (metadata, payload) = codec::decode_entry(&bytes);
        let payload = match &self.transform {
            Some(transform) => transform.transform_on_read(payload),
            None => payload,
        };
        Ok(Some(IndexedEntry {
            position,
            metadata,
            payload,
        }))
    }
}
