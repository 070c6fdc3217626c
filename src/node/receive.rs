//! The message reception pipeline.

use tracing::{debug, instrument};

use crate::block::Block;
use crate::error::NodeError;
use crate::message::{Message, MessagesChain};
use crate::transport::Transport;
use crate::types::{Action, ValidatorId};
use crate::votes_threshold::enough_majority;

use super::Node;

impl Node {
    /// Validate, then dispatch by slot: behind `next_slot` is stale and
    /// ignored, ahead triggers a chain-update request and buffering, current
    /// is handled by the matching per-kind handler.
    #[instrument(skip(self, transport, message), fields(node_id = self.node_id))]
    pub(super) fn receive(
        &mut self,
        message: Message,
        transport: &mut Transport,
        now: u64,
    ) -> Result<(), NodeError> {
        self.validate_message(&message)?;

        match message {
            Message::ChainUpdateRequest { .. } => {
                return self.receive_chain_update_request(message, transport, now);
            }
            Message::ChainUpdate { .. } => {
                return self.receive_chain_update(message, now);
            }
            _ => {}
        }

        let slot = message.referenced_block().expect("non-chain-update kinds always reference a block").block_id;
        let next_slot = self.next_slot();

        if slot < next_slot {
            debug!(node_id = self.node_id, slot, next_slot, "ignoring message for an already-forged slot");
            return Ok(());
        }
        if slot > next_slot {
            let err = NodeError::NotReady { slot, next_slot };
            debug!(node_id = self.node_id, error = %err, "buffering future-slot message");
            self.request_chain_update(transport, now);
            self.buffer_message(message);
            return Err(err);
        }

        match message {
            Message::Commit { sender, block } => self.receive_commit(sender, block),
            Message::Approve { sender, block } => self.receive_approve(sender, block),
            Message::ApproveStatusUpdate { sender, block, evidence } => {
                self.receive_approve_status_update(sender, block, evidence)
            }
            Message::Vote { sender, block, evidence } => self.receive_vote(sender, block, evidence),
            Message::VoteStatusUpdate { sender, block, evidence } => {
                self.receive_vote_status_update(sender, block, evidence, now)
            }
            Message::ChainUpdateRequest { .. } | Message::ChainUpdate { .. } => unreachable!("handled above"),
        }
    }

    /// Reject blocks that violate the proposer rule and evidence for a slot
    /// this node has already forged under a different block.
    fn validate_message(&self, message: &Message) -> Result<(), NodeError> {
        let (Message::ChainUpdateRequest { .. } | Message::ChainUpdate { .. }) = message else {
            let block = message.referenced_block().expect("checked above");
            let sender = message.sender();
            if !self.verify_block(block) {
                return Err(NodeError::MalformedMessage {
                    sender,
                    reason: format!("block {} fails the proposer rule", block.block_id),
                });
            }
            if let Some(manager) = self.candidates.get(&block.block_id) {
                if let Some(forged) = manager.iter().find(|c| c.forged) {
                    if forged.block != *block {
                        return Err(NodeError::ConflictingBlock { sender, slot: block.block_id });
                    }
                }
            }
            return Ok(());
        };
        Ok(())
    }

    fn receive_commit(&mut self, _sender: ValidatorId, block: Block) -> Result<(), NodeError> {
        self.candidate_or_insert(&block);
        Ok(())
    }

    /// Drop the approve once this slot's manager has already emitted an
    /// `APPROVE_STATUS_UPDATE` for *any* of its candidates — checked across
    /// the whole manager, not just the block this approve names, since a
    /// real block and a competing blank block share the same drop policy.
    fn receive_approve(&mut self, sender: ValidatorId, block: Block) -> Result<(), NodeError> {
        let message = Message::Approve { sender, block: block.clone() };
        let node_id = self.node_id;
        let keep_excessive = self.timings.keep_excessive_messages;
        let manager = self.manager_mut(block.block_id);
        if !keep_excessive && manager.check_action(Action::ApproveStatusUpdate) {
            debug!(node_id, slot = block.block_id, sender, "dropping superseded approve");
            return Ok(());
        }
        if manager.find_by_block(&block).is_none() {
            manager.insert(crate::candidate::Candidate::new(block.clone()));
        }
        let candidate = manager.find_by_block_mut(&block).expect("just inserted");
        candidate.messages_approve.insert(sender, message);
        Ok(())
    }

    fn receive_approve_status_update(
        &mut self,
        sender: ValidatorId,
        block: Block,
        evidence: MessagesChain,
    ) -> Result<(), NodeError> {
        if !enough_majority(evidence.len() as u64, self.node_count) {
            return Err(NodeError::InsufficientEvidence {
                sender,
                slot: block.block_id,
                evidence_len: evidence.len(),
            });
        }
        if self.conflicts_with_active_candidate(&block) {
            return Err(NodeError::ConflictingBlock { sender, slot: block.block_id });
        }
        let candidate = self.candidate_or_insert(&block);
        candidate.messages_approve.extend(evidence);
        candidate.approve_status_updates.insert(sender);
        Ok(())
    }

    fn receive_vote(&mut self, sender: ValidatorId, block: Block, evidence: MessagesChain) -> Result<(), NodeError> {
        if !enough_majority(evidence.len() as u64, self.node_count) {
            return Err(NodeError::InsufficientEvidence {
                sender,
                slot: block.block_id,
                evidence_len: evidence.len(),
            });
        }
        if self.conflicts_with_active_candidate(&block) {
            return Err(NodeError::ConflictingBlock { sender, slot: block.block_id });
        }
        let candidate = self.candidate_or_insert(&block);
        candidate.messages_vote.insert(sender, evidence);
        Ok(())
    }

    fn receive_vote_status_update(
        &mut self,
        sender: ValidatorId,
        block: Block,
        evidence: std::collections::HashMap<ValidatorId, MessagesChain>,
        now: u64,
    ) -> Result<(), NodeError> {
        if !enough_majority(evidence.len() as u64, self.node_count) {
            return Err(NodeError::InsufficientEvidence {
                sender,
                slot: block.block_id,
                evidence_len: evidence.len(),
            });
        }
        if self.conflicts_with_active_candidate(&block) {
            return Err(NodeError::ConflictingBlock { sender, slot: block.block_id });
        }
        let candidate = self.candidate_or_insert(&block);
        candidate.messages_vote.extend(evidence);
        candidate.vote_status_updates.insert(sender);
        self.check_and_forge(now);
        Ok(())
    }
}
