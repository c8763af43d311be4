//! Bounded admission queue ordered by submission timestamp.
//!
//! Entries leave in `(submitted_at, sequence)` order: oldest submission
//! first, insertion order breaking ties. The queue refuses new entries once
//! it holds `capacity` of them or after it has been closed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use tokio::sync::oneshot;

use ballot_types::{AdmissionRequest, VoteOutcome};

/// A request waiting for a worker, with the channel its outcome goes back on.
pub struct QueuedAdmission {
    pub request: AdmissionRequest,
    pub responder: oneshot::Sender<VoteOutcome>,
    pub enqueued_at: Instant,
    /// Insertion order counter for FIFO tiebreaking among equal timestamps.
    sequence: u64,
}

impl Eq for QueuedAdmission {}

impl PartialEq for QueuedAdmission {
    fn eq(&self, other: &Self) -> bool {
        self.request.submitted_at == other.request.submitted_at && self.sequence == other.sequence
    }
}

impl Ord for QueuedAdmission {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the earliest timestamp must compare greatest.
        other
            .request
            .submitted_at
            .cmp(&self.request.submitted_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedAdmission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Why [`AdmissionQueue::push`] refused an entry. The entry is handed back.
pub enum PushError {
    Full(QueuedAdmission),
    Closed(QueuedAdmission),
}

pub struct AdmissionQueue {
    heap: BinaryHeap<QueuedAdmission>,
    capacity: usize,
    next_sequence: u64,
    closed: bool,
}

impl AdmissionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(4096)),
            capacity,
            next_sequence: 0,
            closed: false,
        }
    }

    pub fn push(
        &mut self,
        request: AdmissionRequest,
        responder: oneshot::Sender<VoteOutcome>,
    ) -> Result<(), PushError> {
        let entry = QueuedAdmission {
            request,
            responder,
            enqueued_at: Instant::now(),
            sequence: self.next_sequence,
        };
        if self.closed {
            return Err(PushError::Closed(entry));
        }
        if self.heap.len() >= self.capacity {
            return Err(PushError::Full(entry));
        }
        self.next_sequence += 1;
        self.heap.push(entry);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<QueuedAdmission> {
        self.heap.pop()
    }

    /// Stop accepting entries. Already queued entries stay poppable.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::{CandidateId, RequestId, Timestamp, VoterId};

    fn request(id: u64, at: u64) -> AdmissionRequest {
        AdmissionRequest::new(
            RequestId::new(id),
            VoterId::new(format!("voter-{id}")),
            CandidateId::from("1"),
            "Alice",
            Timestamp::new(at),
        )
    }

    fn push(queue: &mut AdmissionQueue, id: u64, at: u64) -> bool {
        let (tx, _rx) = oneshot::channel();
        queue.push(request(id, at), tx).is_ok()
    }

    #[test]
    fn pops_oldest_timestamp_first() {
        let mut queue = AdmissionQueue::new(10);
        push(&mut queue, 1, 300);
        push(&mut queue, 2, 100);
        push(&mut queue, 3, 200);

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.request.id.as_u64())
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut queue = AdmissionQueue::new(10);
        for id in 1..=5 {
            push(&mut queue, id, 100);
        }
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.request.id.as_u64())
            .collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn refuses_entries_beyond_capacity() {
        let mut queue = AdmissionQueue::new(2);
        assert!(push(&mut queue, 1, 1));
        assert!(push(&mut queue, 2, 2));

        let (tx, _rx) = oneshot::channel();
        match queue.push(request(3, 3), tx) {
            Err(PushError::Full(entry)) => assert_eq!(entry.request.id, RequestId::new(3)),
            _ => panic!("expected a full queue"),
        }
        assert_eq!(queue.len(), 2);

        queue.pop();
        assert!(push(&mut queue, 4, 4));
    }

    #[test]
    fn closed_queue_refuses_but_drains() {
        let mut queue = AdmissionQueue::new(4);
        push(&mut queue, 1, 1);
        queue.close();

        let (tx, _rx) = oneshot::channel();
        assert!(matches!(
            queue.push(request(2, 2), tx),
            Err(PushError::Closed(_))
        ));
        assert!(queue.is_closed());
        assert_eq!(queue.pop().map(|e| e.request.id), Some(RequestId::new(1)));
        assert!(queue.is_empty());
    }
}
