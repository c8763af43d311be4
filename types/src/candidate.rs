//! The fixed candidate set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::CandidateId;

/// Read-only mapping from candidate id to display name, supplied at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSet {
    names: BTreeMap<CandidateId, String>,
}

impl CandidateSet {
    pub fn new<I, C, N>(candidates: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<CandidateId>,
        N: Into<String>,
    {
        Self {
            names: candidates
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.names.contains_key(id)
    }

    pub fn name(&self, id: &CandidateId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Candidate ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &CandidateId> {
        self.names.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CandidateId, &str)> {
        self.names.iter().map(|(id, name)| (id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
