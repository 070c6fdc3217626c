//! Per-(slot, proposer) quorum bookkeeping.

#[cfg(test)]
#[path = "candidate_test.rs"]
mod candidate_test;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::message::Message;
use crate::types::{Action, ValidatorId};

/// Evidence a node attached when casting its vote: the approve messages chain
/// it used to justify that vote.
pub type EvidenceMap = HashMap<ValidatorId, Message>;

/// Accumulates quorum evidence for one specific [`Block`] as it moves through
/// the four broadcast rounds. Never regresses: every evidence map and
/// `actions_taken` only grow, until `forged` becomes `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub block: Block,
    pub messages_approve: HashMap<ValidatorId, Message>,
    pub approve_status_updates: HashSet<ValidatorId>,
    pub messages_vote: HashMap<ValidatorId, EvidenceMap>,
    pub vote_status_updates: HashSet<ValidatorId>,
    pub actions_taken: HashSet<Action>,
    pub forged: bool,
}

impl Candidate {
    pub fn new(block: Block) -> Self {
        Self {
            block,
            messages_approve: HashMap::new(),
            approve_status_updates: HashSet::new(),
            messages_vote: HashMap::new(),
            vote_status_updates: HashSet::new(),
            actions_taken: HashSet::new(),
            forged: false,
        }
    }

    /// Gate an emission: returns `true` the first time `action` is taken on
    /// this Candidate, `false` on every subsequent call, so a replayed
    /// precondition can never cause a double broadcast.
    pub fn take_action(&mut self, action: Action) -> bool {
        self.actions_taken.insert(action)
    }

    pub fn has_taken(&self, action: Action) -> bool {
        self.actions_taken.contains(&action)
    }

    /// The strict ordering key used by [`crate::candidate_manager::CandidateManager::best_candidate`]:
    /// `forged` first, then the four evidence-map sizes, all descending.
    fn ordering_key(&self) -> (bool, usize, usize, usize, usize) {
        (
            self.forged,
            self.vote_status_updates.len(),
            self.messages_vote.len(),
            self.approve_status_updates.len(),
            self.messages_approve.len(),
        )
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.ordering_key() == other.ordering_key()
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}
