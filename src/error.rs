//! Error kinds a [`crate::node::Node`] can surface.

use thiserror::Error;

use crate::types::{Slot, ValidatorId};

/// All non-fatal kinds are logged and the triggering message is discarded
/// by the caller; [`NodeError::InvalidChain`] is the only fatal kind and is
/// only ever returned from [`crate::node::Node::new`].
#[derive(Debug, Error, PartialEq)]
pub enum NodeError {
    #[error("malformed message from node {sender}: {reason}")]
    MalformedMessage { sender: ValidatorId, reason: String },

    #[error("insufficient evidence from node {sender} for slot {slot}: {evidence_len} entries")]
    InsufficientEvidence { sender: ValidatorId, slot: Slot, evidence_len: usize },

    #[error("conflicting block from node {sender} for slot {slot}")]
    ConflictingBlock { sender: ValidatorId, slot: Slot },

    #[error("message for slot {slot} is not ready to be processed, current next slot is {next_slot}")]
    NotReady { slot: Slot, next_slot: Slot },

    #[error("no active candidate for slot {slot}")]
    NoCandidate { slot: Slot },

    #[error("initial chain is invalid: {reason}")]
    InvalidChain { reason: String },
}
