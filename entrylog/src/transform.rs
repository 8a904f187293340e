//! Payload transform hook.
//!
//! An optional byte transform applied to the payload portion of an entry,
//! after the metadata header has been separated out: on write the transform
//! sees the payload about to be stored, on read the stored payload about to
//! be returned. Transforms are pure byte mappings with no ordering or
//! persistence concerns; they compose around the header codec, never inside
//! it, so index semantics are untouched.

use bytes::Bytes;

/// A pure byte transform applied to entry payloads.
///
/// `transform_on_read` is expected to invert `transform_on_write`; the
/// engine does not verify this.
pub trait PayloadTransform: Send + Sync {
    /// Transforms a payload before it is stored.
    fn transform_on_write(&self, payload: Bytes) -> Bytes;

    /// Transforms a stored payload before it is returned to a reader.
    fn transform_on_read(&self, payload: Bytes) -> Bytes;
}
