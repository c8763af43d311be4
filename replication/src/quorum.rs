//! Quorum arithmetic.

use serde::{Deserialize, Serialize};

/// Acknowledgements required out of `replicas`: `replicas / 2 + 1`.
///
/// Integer division on purpose: with four replicas three must acknowledge.
pub fn quorum_size(replicas: usize) -> usize {
    replicas / 2 + 1
}

/// Final verdict of a replication round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumDecision {
    /// Enough acknowledgements arrived.
    Reached,
    /// Too many attempts failed for the quorum to still be reachable.
    Unreachable,
}

/// Counts replica outcomes as they arrive and fixes the decision the moment
/// it is mathematically settled. Later outcomes never change it.
#[derive(Clone, Debug)]
pub struct QuorumTracker {
    total: usize,
    required: usize,
    acknowledged: usize,
    failed: usize,
    decision: Option<QuorumDecision>,
}

impl QuorumTracker {
    pub fn new(total: usize) -> Self {
        let mut tracker = Self {
            total,
            required: quorum_size(total),
            acknowledged: 0,
            failed: 0,
            decision: None,
        };
        tracker.decide();
        tracker
    }

    /// Record one replica outcome. Returns the decision only on the call
    /// that settles it.
    pub fn record(&mut self, success: bool) -> Option<QuorumDecision> {
        if success {
            self.acknowledged += 1;
        } else {
            self.failed += 1;
        }
        if self.decision.is_some() {
            return None;
        }
        self.decide()
    }

    fn decide(&mut self) -> Option<QuorumDecision> {
        let outstanding = self.total.saturating_sub(self.acknowledged + self.failed);
        let decision = if self.acknowledged >= self.required {
            Some(QuorumDecision::Reached)
        } else if self.acknowledged + outstanding < self.required {
            Some(QuorumDecision::Unreachable)
        } else {
            None
        };
        self.decision = decision;
        decision
    }

    pub fn decision(&self) -> Option<QuorumDecision> {
        self.decision
    }

    /// Number of outcomes recorded so far.
    pub fn recorded(&self) -> usize {
        self.acknowledged + self.failed
    }

    pub fn acknowledged(&self) -> usize {
        self.acknowledged
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
