use crate::batch::Batch;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Queue handle shared between the submission path and the dispatcher.
pub type SharedQueue = Arc<Mutex<PriorityQueue>>;

/// Pending batches ordered by priority (highest first), then `created_time`
/// (oldest first), then enqueue order.
///
/// Backed by a max-heap; the tie-breaking sequence number makes the order
/// total, so batches with identical priority and `created_time` come out in
/// the order they went in.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

#[derive(Debug)]
struct HeapEntry {
    seq: u64,
    batch: Batch,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater pops first: higher priority, then earlier time, then lower seq
        self.batch
            .priority
            .cmp(&other.batch.priority)
            .then_with(|| other.batch.created_time.cmp(&self.batch.created_time))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedQueue {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn enqueue(&mut self, batch: Batch) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry { seq, batch });
    }

    /// Remove and return the next batch, or `None` when empty.
    pub fn dequeue(&mut self) -> Option<Batch> {
        self.heap.pop().map(|entry| entry.batch)
    }

    pub fn peek(&self) -> Option<&Batch> {
        self.heap.peek().map(|entry| &entry.batch)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// All pending batches in dequeue order, leaving the queue untouched.
    pub fn snapshot(&self) -> Vec<Batch> {
        let mut entries: Vec<&HeapEntry> = self.heap.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| entry.batch.clone()).collect()
    }
}
