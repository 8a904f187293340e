//! Codec for the entry metadata header.
//!
//! Entries written while at least one contributor is active are stored as
//! `[header][payload]`. The header is a fixed-layout, versioned binary
//! structure:
//!
//! ```text
//! | magic (u16 BE) | version (u8) | flags (u8) | index (u64 BE)? | broker_time_ms (i64 BE)? |
//! ```
//!
//! The magic marker distinguishes a header from a raw legacy payload; an
//! entry whose first bytes are not the marker decodes as "no metadata", not
//! as an error. `flags` records which optional fields follow, so a header
//! written under one contributor configuration still decodes after the
//! configuration changes. All reserved flag bits must be zero; a header with
//! unknown bits set cannot be sized and is treated as undecodable.
//!
//! Decoding reads at most [`MAX_HEADER_LEN`] bytes regardless of entry size,
//! which keeps per-entry cost bounded for position search, where many
//! entries are decoded without materializing payloads.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Marker identifying a metadata header at the start of a stored entry.
const METADATA_MAGIC: u16 = 0x0e02;

/// Current header format version.
const METADATA_VERSION: u8 = 0x01;

/// Flag bit: the index field is present.
const FLAG_INDEX: u8 = 0x01;

/// Flag bit: the broker timestamp field is present.
const FLAG_BROKER_TIME: u8 = 0x02;

const RESERVED_FLAGS: u8 = !(FLAG_INDEX | FLAG_BROKER_TIME);

/// Fixed prefix: magic + version + flags.
const FIXED_PREFIX_LEN: usize = 4;

/// Upper bound on the encoded header length, with every field present.
pub const MAX_HEADER_LEN: usize = FIXED_PREFIX_LEN + 8 + 8;

/// The decoded metadata header of a stored entry.
///
/// Fields are optional: each is present only if the corresponding
/// contributor was active when the entry was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Broker-assigned logical index: the last logical offset consumed by
    /// this entry, zero-based.
    pub index: Option<u64>,

    /// Broker wall-clock time at append, in milliseconds since the Unix
    /// epoch.
    pub broker_time_ms: Option<i64>,
}

impl EntryMetadata {
    /// Returns true if no contributor produced a field.
    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.broker_time_ms.is_none()
    }

    /// Returns the encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        let mut len = FIXED_PREFIX_LEN;
        if self.index.is_some() {
            len += 8;
        }
        if self.broker_time_ms.is_some() {
            len += 8;
        }
        len
    }

    /// Encodes the header into `buf`.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.index.is_some() {
            flags |= FLAG_INDEX;
        }
        if self.broker_time_ms.is_some() {
            flags |= FLAG_BROKER_TIME;
        }

        buf.put_u16(METADATA_MAGIC);
        buf.put_u8(METADATA_VERSION);
        buf.put_u8(flags);
        if let Some(index) = self.index {
            buf.put_u64(index);
        }
        if let Some(time_ms) = self.broker_time_ms {
            buf.put_i64(time_ms);
        }
    }

    /// Decodes a header from the start of a stored entry.
    ///
    /// Returns the fields and the byte offset where the payload begins, or
    /// `None` when the entry carries no decodable header: marker absent,
    /// unknown version, reserved flag bits set, or a header truncated short
    /// of its declared fields. Decoding never fails a scan; callers treat
    /// `None` as "entry predates metadata".
    pub fn decode(data: &[u8]) -> Option<(EntryMetadata, usize)> {
        if data.len() < FIXED_PREFIX_LEN {
            return None;
        }
        if u16::from_be_bytes([data[0], data[1]]) != METADATA_MAGIC {
            return None;
        }
        if data[2] != METADATA_VERSION {
            tracing::debug!(version = data[2], "unknown metadata header version");
            return None;
        }
        let flags = data[3];
        if flags & RESERVED_FLAGS != 0 {
            tracing::debug!(flags, "metadata header with reserved flag bits");
            return None;
        }

        let mut meta = EntryMetadata::default();
        let mut offset = FIXED_PREFIX_LEN;
        if flags & FLAG_INDEX != 0 {
            let bytes = data.get(offset..offset + 8)?;
            meta.index = Some(u64::from_be_bytes(bytes.try_into().unwrap()));
            offset += 8;
        }
        if flags & FLAG_BROKER_TIME != 0 {
            let bytes = data.get(offset..offset + 8)?;
            meta.broker_time_ms = Some(i64::from_be_bytes(bytes.try_into().unwrap()));
            offset += 8;
        }

        Some((meta, offset))
    }
}

/// Encodes a full entry: header followed by payload.
pub fn encode_entry(meta: &EntryMetadata, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(meta.encoded_len() + payload.len());
    meta.encode_to(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

/// Splits a stored entry into its decoded header and payload.
///
/// Entries without a decodable header are returned whole as payload with no
/// metadata.
pub fn decode_entry(entry: &Bytes) -> (Option<EntryMetadata>, Bytes) {
    match EntryMetadata::decode(entry) {
        Some((meta, offset)) => (Some(meta), entry.slice(offset..)),
        None => (None, entry.clone()),
    }
}

/// Encodes a checkpointed index value for a segment property.
pub fn encode_index_property(index: u64) -> Bytes {
    Bytes::copy_from_slice(&index.to_be_bytes())
}

/// Decodes a checkpointed index value from a segment property.
pub fn decode_index_property(value: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| {
        Error::Encoding(format!(
            "index property must be 8 bytes, got {}",
            value.len()
        ))
    })?;
    Ok(u64::from_be_bytes(bytes))
}
