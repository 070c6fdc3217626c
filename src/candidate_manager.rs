//! Ordered collection of concurrent [`Candidate`]s for a single slot.

#[cfg(test)]
#[path = "candidate_manager_test.rs"]
mod candidate_manager_test;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::candidate::Candidate;
use crate::types::{Action, ValidatorId};

/// Holds every Candidate a node has seen for one slot — normally just the
/// proposer's real block, but a blank-block fallback can coexist and
/// accumulate evidence concurrently until one of them reaches a later round
/// first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateManager {
    candidates: Vec<Candidate>,
}

impl CandidateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Insert a new Candidate unless one with an equal [`Block`] already
    /// exists. Returns `false` (and leaves the manager unchanged) on a
    /// duplicate, matching `node.py::add_candidate`'s dedup behaviour.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.find_by_block(&candidate.block).is_some() {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn find_by_block(&self, block: &Block) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.block == block)
    }

    pub fn find_by_block_mut(&mut self, block: &Block) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| &c.block == block)
    }

    pub fn find_by_proposer(&self, proposer: Option<ValidatorId>) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.block.node_id == proposer)
    }

    pub fn find_by_proposer_mut(&mut self, proposer: Option<ValidatorId>) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| c.block.node_id == proposer)
    }

    /// `true` if any Candidate in this manager has itself emitted `action`.
    pub fn check_action(&self, action: Action) -> bool {
        self.candidates.iter().any(|c| c.has_taken(action))
    }

    /// The Candidate furthest along the protocol, under [`Candidate`]'s
    /// total order. `None` if the manager is empty.
    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.candidates.iter().max()
    }

    /// Merge a Candidate received via chain-update: replace the local entry
    /// for the same Block only if the incoming one is strictly further
    /// along; otherwise insert it if it is new.
    pub fn merge(&mut self, incoming: Candidate) {
        if let Some(existing) = self.find_by_block_mut(&incoming.block) {
            if *existing < incoming {
                *existing = incoming;
            }
            return;
        }
        self.candidates.push(incoming);
    }
}
