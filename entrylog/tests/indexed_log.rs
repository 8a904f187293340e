//! End-to-end tests for index assignment, recovery, and position search.
//!
//! The in-memory segmented log keeps its state in an `Arc`, so reopening an
//! `IndexedLog` over the same `Arc` models a process restart against durable
//! storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::{
    EntryReader, InMemoryLog, LogResult, Position, SegmentId, SegmentInfo, SegmentedLog,
};
use entrylog::{Config, Error, IndexedLog, PayloadTransform};

fn shared(max_entries_per_segment: usize) -> Arc<dyn SegmentedLog> {
    InMemoryLog::shared(max_entries_per_segment)
}

async fn open(log: &Arc<dyn SegmentedLog>) -> IndexedLog {
    IndexedLog::open(Arc::clone(log), Config::standard())
        .await
        .expect("open indexed log")
}

#[tokio::test]
async fn should_assign_batch_indices_in_append_order() {
    // given
    let log = shared(1024);
    let indexed = open(&log).await;

    // when: ten entries, each carrying two logical messages
    for i in 0..10 {
        indexed
            .append(Bytes::from(format!("message-{}", i)), 2)
            .await
            .unwrap();
    }

    // then
    assert_eq!(indexed.current_index(), Some(19));

    let mut reader = indexed.open_reader(Position::default()).await.unwrap();
    let mut count = 0u64;
    while let Some(entry) = reader.next().await.unwrap() {
        let meta = entry.metadata.expect("entry has metadata");
        assert_eq!(meta.index, Some((count + 1) * 2 - 1));
        assert_eq!(entry.payload, Bytes::from(format!("message-{}", count)));
        count += 1;
    }
    assert_eq!(count, 10);
}

#[tokio::test]
async fn should_resume_indexing_after_reopen() {
    // given: five batch-2 entries, then a clean close
    let log = shared(1024);
    let indexed = open(&log).await;
    for _ in 0..5 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }
    assert_eq!(indexed.current_index(), Some(9));
    indexed.close().await.unwrap();

    // when: reopen over the same underlying log
    let reopened = open(&log).await;

    // then: the counter continues exactly where it stopped
    assert_eq!(reopened.current_index(), Some(9));
    let position = reopened.append(Bytes::from("more"), 3).await.unwrap();
    let entry_bytes = log.read_entry(position).await.unwrap().unwrap();
    let meta = reopened.decode_header(&entry_bytes).unwrap();
    assert_eq!(meta.index, Some(12));
}

#[tokio::test]
async fn should_recover_from_entries_when_close_was_skipped() {
    // given: a crash before any checkpoint was written
    let log = shared(1024);
    let indexed = open(&log).await;
    for _ in 0..5 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }
    drop(indexed);

    // when
    let reopened = open(&log).await;

    // then: the index is re-derived from entry headers
    assert_eq!(reopened.current_index(), Some(9));
    let position = reopened.append(Bytes::from("more"), 3).await.unwrap();
    let entry_bytes = log.read_entry(position).await.unwrap().unwrap();
    assert_eq!(reopened.decode_header(&entry_bytes).unwrap().index, Some(12));
}

#[tokio::test]
async fn should_match_never_closed_log_across_restarts() {
    // given: the same batch sizes written with and without a restart
    let batches = [3u64, 1, 4, 1, 5, 9, 2, 6];

    let uninterrupted = shared(3);
    let log_a = open(&uninterrupted).await;
    for &batch in &batches {
        log_a.append(Bytes::from("entry"), batch).await.unwrap();
    }

    let interrupted = shared(3);
    let log_b = open(&interrupted).await;
    for &batch in &batches[..4] {
        log_b.append(Bytes::from("entry"), batch).await.unwrap();
    }
    log_b.close().await.unwrap();
    let log_b = open(&interrupted).await;
    for &batch in &batches[4..] {
        log_b.append(Bytes::from("entry"), batch).await.unwrap();
    }

    // then: sum of all batch sizes minus one, either way
    let expected: u64 = batches.iter().sum::<u64>() - 1;
    assert_eq!(log_a.current_index(), Some(expected));
    assert_eq!(log_b.current_index(), Some(expected));
}

#[tokio::test]
async fn should_find_positions_within_a_single_segment() {
    // given: indices 1, 3, 5, 7, 9
    let log = shared(1024);
    let indexed = open(&log).await;
    for _ in 0..5 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }

    // then
    assert_eq!(indexed.find_position(0).await.unwrap(), Position::new(0, 0));
    assert_eq!(indexed.find_position(4).await.unwrap(), Position::new(0, 2));
    assert_eq!(
        indexed.find_position(100).await.unwrap(),
        Position::new(0, 5)
    );
}

#[tokio::test]
async fn should_find_positions_across_rollovers_and_reopen() {
    // given: batch-2 entries, five entries per segment
    let log = shared(5);
    let indexed = open(&log).await;
    for _ in 0..5 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }
    assert_eq!(indexed.current_index(), Some(9));

    // every index maps to the entry that consumed it: entry_id = index / 2
    for index in 0..=9u64 {
        let position = indexed.find_position(index).await.unwrap();
        assert_eq!(position.entry_id, (index % 10) / 2, "index {}", index);
    }

    // when: roll into a second segment
    for _ in 0..5 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }
    assert_eq!(indexed.current_index(), Some(19));
    for index in 0..=19u64 {
        let position = indexed.find_position(index).await.unwrap();
        assert_eq!(position.segment_id, index / 10, "index {}", index);
        assert_eq!(position.entry_id, (index % 10) / 2, "index {}", index);
    }

    // and: reopen, then fill a third segment
    indexed.close().await.unwrap();
    let reopened = open(&log).await;
    for _ in 0..5 {
        reopened.append(Bytes::from("entry"), 2).await.unwrap();
    }
    assert_eq!(reopened.current_index(), Some(29));
    for index in 0..=29u64 {
        let position = reopened.find_position(index).await.unwrap();
        assert_eq!(position.segment_id, index / 10, "index {}", index);
        assert_eq!(position.entry_id, (index % 10) / 2, "index {}", index);
    }
}

#[tokio::test]
async fn should_write_rollover_checkpoints_into_segment_properties() {
    // given: batch-2 entries, five per segment
    let log = shared(5);
    let indexed = open(&log).await;

    // when: fill segment 0 and roll into segment 1
    for _ in 0..6 {
        indexed.append(Bytes::from("entry"), 2).await.unwrap();
    }

    // then: the sealed segment carries the index of its last entry
    let segments = log.segments().await.unwrap();
    assert!(segments[0].sealed);
    let value = segments[0].properties.get(entrylog::INDEX_PROPERTY).unwrap();
    assert_eq!(value.as_ref(), 9u64.to_be_bytes());
}

/// Counts reader opens so tests can assert search cost stays logarithmic.
struct ProbeCountingLog {
    inner: Arc<dyn SegmentedLog>,
    reader_opens: AtomicUsize,
}

impl ProbeCountingLog {
    fn new(inner: Arc<dyn SegmentedLog>) -> Self {
        Self {
            inner,
            reader_opens: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SegmentedLog for ProbeCountingLog {
    async fn append(&self, entry: Bytes) -> LogResult<Position> {
        self.inner.append(entry).await
    }

    async fn open_reader(&self, start: Position) -> LogResult<Box<dyn EntryReader>> {
        self.reader_opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_reader(start).await
    }

    async fn segments(&self) -> LogResult<Vec<SegmentInfo>> {
        self.inner.segments().await
    }

    async fn write_segment_property(
        &self,
        segment_id: SegmentId,
        key: &str,
        value: Bytes,
    ) -> LogResult<()> {
        self.inner.write_segment_property(segment_id, key, value).await
    }
}

#[tokio::test]
async fn should_prune_segments_with_bounded_probes() {
    // given: ten batch-1 entries, five per segment
    let counting = Arc::new(ProbeCountingLog::new(shared(5)));
    let log: Arc<dyn SegmentedLog> = counting.clone();
    let indexed = open(&log).await;
    for _ in 0..10 {
        indexed.append(Bytes::from("entry"), 1).await.unwrap();
    }

    // when: the target lives in the second segment
    counting.reader_opens.store(0, Ordering::SeqCst);
    let position = indexed.find_position(6).await.unwrap();

    // then: a handful of header probes, not a scan of segment 0
    assert_eq!(position, Position::new(1, 1));
    let probes = counting.reader_opens.load(Ordering::SeqCst);
    assert!(probes <= 6, "expected bounded probing, got {} reads", probes);
}

#[tokio::test]
async fn should_search_and_recover_over_legacy_entries() {
    // given: entries written before any contributor was configured
    let log = shared(1024);
    let legacy = IndexedLog::open(Arc::clone(&log), Config::default())
        .await
        .unwrap();
    legacy.append(Bytes::from("old-1"), 1).await.unwrap();
    legacy.append(Bytes::from("old-2"), 1).await.unwrap();

    // when: metadata is enabled on reopen
    let indexed = open(&log).await;

    // then: no index history exists, so the first indexed entry starts fresh
    assert_eq!(indexed.current_index(), None);
    let position = indexed.append(Bytes::from("new"), 2).await.unwrap();
    let bytes = log.read_entry(position).await.unwrap().unwrap();
    assert_eq!(indexed.decode_header(&bytes).unwrap().index, Some(1));

    // legacy entries decode as no metadata and compare as index 0
    assert!(indexed
        .decode_header(&log.read_entry(Position::new(0, 0)).await.unwrap().unwrap())
        .is_none());
    assert_eq!(indexed.find_position(0).await.unwrap(), Position::new(0, 0));
    assert_eq!(indexed.find_position(1).await.unwrap(), Position::new(0, 2));
}

/// Inverts every payload byte; applying it twice restores the original.
struct InvertingTransform;

impl PayloadTransform for InvertingTransform {
    fn transform_on_write(&self, payload: Bytes) -> Bytes {
        payload.iter().map(|b| !b).collect::<Vec<u8>>().into()
    }

    fn transform_on_read(&self, payload: Bytes) -> Bytes {
        payload.iter().map(|b| !b).collect::<Vec<u8>>().into()
    }
}

#[tokio::test]
async fn should_compose_payload_transform_around_header() {
    // given
    let log = shared(1024);
    let indexed = IndexedLog::open_with_transform(
        Arc::clone(&log),
        Config::standard(),
        Arc::new(InvertingTransform),
    )
    .await
    .unwrap();

    // when
    let position = indexed.append(Bytes::from("Test Message"), 1).await.unwrap();

    // then: the stored payload is transformed, the header is not
    let stored = log.read_entry(position).await.unwrap().unwrap();
    let meta = indexed.decode_header(&stored).unwrap();
    assert_eq!(meta.index, Some(0));
    let stored_payload = &stored[stored.len() - "Test Message".len()..];
    assert_ne!(stored_payload, b"Test Message");

    // and: the read path restores the original bytes
    let mut reader = indexed.open_reader(Position::default()).await.unwrap();
    let entry = reader.next().await.unwrap().unwrap();
    assert_eq!(entry.payload, Bytes::from("Test Message"));
    assert_eq!(entry.metadata.unwrap().index, Some(0));
}

#[tokio::test]
async fn should_fail_open_on_corrupt_checkpoint() {
    // given: a structurally corrupt index property
    let log = shared(1024);
    let indexed = open(&log).await;
    indexed.append(Bytes::from("entry"), 1).await.unwrap();
    log.write_segment_property(0, entrylog::INDEX_PROPERTY, Bytes::from_static(&[0xff]))
        .await
        .unwrap();

    // when
    let result = IndexedLog::open(Arc::clone(&log), Config::standard()).await;

    // then: fatal, never silently defaulted to index 0
    assert!(matches!(result, Err(Error::Recovery(_))));
}
