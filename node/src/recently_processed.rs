//! Recently-processed request cache — makes repeated delivery of the same
//! request id harmless.
//!
//! Completed outcomes are kept in a bounded FIFO map: when full, the oldest
//! entry is evicted to make room for a new one. Requests currently being
//! processed are tracked separately and never evicted.

use ballot_types::{RequestId, VoteOutcome};
use std::collections::{HashMap, HashSet, VecDeque};

/// What a worker should do with a delivered request id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// First delivery; the caller now owns processing and must call
    /// [`RecentlyProcessed::finish`].
    First,
    /// Another delivery of this id is still being processed.
    InFlight,
    /// Already processed; replay this outcome.
    Completed(VoteOutcome),
}

pub struct RecentlyProcessed {
    outcomes: HashMap<RequestId, VoteOutcome>,
    order: VecDeque<RequestId>,
    in_flight: HashSet<RequestId>,
    capacity: usize,
}

impl RecentlyProcessed {
    pub fn new(capacity: usize) -> Self {
        Self {
            outcomes: HashMap::with_capacity(capacity.min(4096)),
            order: VecDeque::with_capacity(capacity.min(4096)),
            in_flight: HashSet::new(),
            capacity,
        }
    }

    pub fn begin(&mut self, id: RequestId) -> Delivery {
        if let Some(outcome) = self.outcomes.get(&id) {
            return Delivery::Completed(outcome.clone());
        }
        if !self.in_flight.insert(id) {
            return Delivery::InFlight;
        }
        Delivery::First
    }

    /// Record the outcome of a request, evicting the oldest entry if at capacity.
    pub fn finish(&mut self, id: RequestId, outcome: VoteOutcome) {
        self.in_flight.remove(&id);
        if self.capacity == 0 || self.outcomes.contains_key(&id) {
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.outcomes.remove(&evicted);
            }
        }
        self.outcomes.insert(id, outcome);
        self.order.push_back(id);
    }

    pub fn outcome(&self, id: RequestId) -> Option<&VoteOutcome> {
        self.outcomes.get(&id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of completed entries in the cache.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
