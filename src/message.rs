//! The seven message kinds nodes exchange.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::candidate_manager::CandidateManager;
use crate::types::{Slot, ValidatorId};

/// Evidence attached to a status-update message: one evidence entry per
/// node that contributed to the quorum being claimed.
pub type MessagesChain = HashMap<ValidatorId, Message>;

/// A tagged envelope carrying exactly the fields its kind needs. Sender
/// identity is part of equality — two otherwise-identical messages from
/// different senders are not the same message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Commit { sender: ValidatorId, block: Block },
    Approve { sender: ValidatorId, block: Block },
    ApproveStatusUpdate { sender: ValidatorId, block: Block, evidence: MessagesChain },
    Vote { sender: ValidatorId, block: Block, evidence: MessagesChain },
    VoteStatusUpdate { sender: ValidatorId, block: Block, evidence: HashMap<ValidatorId, MessagesChain> },
    ChainUpdateRequest { sender: ValidatorId, last_block: Option<Block> },
    ChainUpdate { sender: ValidatorId, chain: Vec<Block>, candidates: Option<(Slot, CandidateManager)> },
}

impl Message {
    pub fn sender(&self) -> ValidatorId {
        match self {
            Message::Commit { sender, .. }
            | Message::Approve { sender, .. }
            | Message::ApproveStatusUpdate { sender, .. }
            | Message::Vote { sender, .. }
            | Message::VoteStatusUpdate { sender, .. }
            | Message::ChainUpdateRequest { sender, .. }
            | Message::ChainUpdate { sender, .. } => *sender,
        }
    }

    /// The slot this message refers to, if it carries exactly one block.
    /// `ChainUpdate` has no single referenced block and `ChainUpdateRequest`
    /// refers to the requester's *last committed* slot, not the next one.
    pub fn referenced_block(&self) -> Option<&Block> {
        match self {
            Message::Commit { block, .. }
            | Message::Approve { block, .. }
            | Message::ApproveStatusUpdate { block, .. }
            | Message::Vote { block, .. }
            | Message::VoteStatusUpdate { block, .. } => Some(block),
            Message::ChainUpdateRequest { .. } | Message::ChainUpdate { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Commit { .. } => "COMMIT",
            Message::Approve { .. } => "APPROVE",
            Message::ApproveStatusUpdate { .. } => "APPROVE_STATUS_UPDATE",
            Message::Vote { .. } => "VOTE",
            Message::VoteStatusUpdate { .. } => "VOTE_STATUS_UPDATE",
            Message::ChainUpdateRequest { .. } => "CHAIN_UPDATE_REQUEST",
            Message::ChainUpdate { .. } => "CHAIN_UPDATE",
        }
    }
}

/// Deep-copy on send, modelled as serialise/deserialise at the transport
/// boundary so a receiver can never observe sender-side mutations, even if
/// the in-process representation is `Clone`.
pub fn deep_copy(message: &Message) -> Message {
    let encoded = serde_json::to_vec(message).expect("message must serialise");
    serde_json::from_slice(&encoded).expect("message must round-trip")
}
