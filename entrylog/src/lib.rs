//! Entrylog - broker-assigned entry indexing for segmented logs.
//!
//! Entrylog augments an append-only, segmented log with per-entry metadata,
//! most importantly a strictly monotonically increasing logical index that
//! survives segment rollover and process restart. An entry may represent a
//! batch of logical messages; its index is the last logical offset the entry
//! consumes, so for batch sizes `b_1..b_n` the k-th entry's index is
//! `b_1 + .. + b_k - 1`.
//!
//! # Architecture
//!
//! - [`IndexedLog`]: the main entry point. Wraps a
//!   [`SegmentedLog`](common::SegmentedLog), runs a configured chain of
//!   metadata contributors on every append, prepends the encoded metadata
//!   header to the stored entry, and checkpoints the index counter into
//!   segment properties as segments seal.
//! - [`EntryMetadata`]: the versioned binary header and its codec.
//! - [`IndexAssigner`]: the monotonic counter behind the `"index"`
//!   contributor.
//! - Recovery: at open, the last assigned index is reconstructed from the
//!   newest checkpointed segment property and verified against the entries
//!   written after it, before any new append is accepted.
//! - [`IndexedLog::find_position`]: locates the earliest entry whose index
//!   reaches a target, using per-segment index ranges to prune and a binary
//!   search within the candidate segment.
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use common::InMemoryLog;
//! use entrylog::{Config, IndexedLog};
//!
//! let log = InMemoryLog::shared(1024);
//! let indexed = IndexedLog::open(log, Config::standard()).await?;
//!
//! // One physical entry carrying two logical messages: index 1.
//! let position = indexed.append(Bytes::from("payload"), 2).await?;
//! assert_eq!(indexed.current_index(), Some(1));
//!
//! // First entry whose index reaches 1.
//! assert_eq!(indexed.find_position(1).await?, position);
//! ```

mod assigner;
mod codec;
mod config;
mod contributor;
mod error;
mod log;
mod recovery;
mod search;
mod transform;

pub use assigner::IndexAssigner;
pub use codec::{EntryMetadata, MAX_HEADER_LEN};
pub use config::{Config, BROKER_TIMESTAMP_CONTRIBUTOR, INDEX_CONTRIBUTOR};
pub use contributor::{ContributorChain, MetadataContributor};
pub use error::{Error, Result};
pub use log::{IndexedEntry, IndexedLog, IndexedReader};
pub use recovery::INDEX_PROPERTY;
pub use transform::PayloadTransform;
