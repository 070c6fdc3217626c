//! Immutable slot records.

use serde::{Deserialize, Serialize};

use crate::types::ValidatorId;

/// A single slot in the committed chain.
///
/// Equality deliberately ignores `body` and `created`: two nodes that
/// independently fabricate a blank block for the same slot must be able to
/// recognise it as the same [`Block`] so their evidence merges into one
/// [`crate::candidate::Candidate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub block_id: u64,
    /// `None` denotes a blank block, nominated when the designated proposer stalls.
    pub node_id: Option<ValidatorId>,
    pub body: String,
    pub created: u64,
}

impl Block {
    pub fn new(block_id: u64, node_id: Option<ValidatorId>, body: impl Into<String>, created: u64) -> Self {
        Self { block_id, node_id, body: body.into(), created }
    }

    pub fn blank(block_id: u64, created: u64) -> Self {
        Self::new(block_id, None, "blank block", created)
    }

    /// `None` at slot 0, `Some(block_id - 1)` otherwise.
    pub fn prev_block_id(&self) -> Option<u64> {
        self.block_id.checked_sub(1)
    }

    /// The proposer rule: a non-blank block at slot `i` must have been proposed by `i mod n`.
    pub fn satisfies_proposer_rule(&self, node_count: u64) -> bool {
        match self.node_id {
            None => true,
            Some(id) => self.block_id % node_count == id,
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.block_id == other.block_id && self.node_id == other.node_id
    }
}

impl Eq for Block {}

impl std::hash::Hash for Block {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.block_id.hash(state);
        self.node_id.hash(state);
    }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
