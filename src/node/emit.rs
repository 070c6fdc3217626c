//! Round emission: proposing, and the four gated broadcasts that move a
//! Candidate through APPROVE → APPROVE_STATUS_UPDATE → VOTE →
//! VOTE_STATUS_UPDATE.

use tracing::instrument;

use crate::block::Block;
use crate::message::Message;
use crate::transport::Transport;
use crate::types::Action;
use crate::votes_threshold::enough_majority;

use super::Node;

impl Node {
    pub(super) fn broadcast(&self, message: &Message, transport: &mut Transport, now: u64) {
        for recipient in 0..self.node_count {
            if recipient == self.node_id {
                continue;
            }
            transport.send(message, recipient, now);
        }
    }

    /// Self-propose a block if this node is `next_slot`'s designated
    /// proposer and has not already done so.
    pub(super) fn gen_commit(&mut self, transport: &mut Transport, now: u64) {
        if self.next_slot_proposer() != self.node_id {
            return;
        }
        let slot = self.next_slot();
        if self.candidates.get(&slot).is_some_and(|m| m.find_by_proposer(Some(self.node_id)).is_some()) {
            return;
        }
        let block = Block::new(slot, Some(self.node_id), format!("block {slot} proposed by node {}", self.node_id), now);
        self.candidate_or_insert(&block);
        let message = Message::Commit { sender: self.node_id, block };
        self.broadcast(&message, transport, now);
    }

    /// Nominate a blank block once this node has been idle past
    /// `blank_block_timeout` with nothing to vote on — the liveness
    /// fallback for a stalled or offline proposer.
    pub(super) fn try_approving_blank_block(&mut self, transport: &mut Transport, now: u64) {
        let idle = now.saturating_sub(self.last_activity_time());
        if idle < self.timings.blank_block_timeout {
            return;
        }
        let slot = self.next_slot();
        let block = Block::blank(slot, now);
        self.candidate_or_insert(&block);
        let message = Message::Commit { sender: self.node_id, block };
        self.broadcast(&message, transport, now);
    }

    #[instrument(skip(self, transport), fields(node_id = self.node_id))]
    pub(super) fn send_approve_once(&mut self, transport: &mut Transport, now: u64) {
        let node_id = self.node_id;
        let Some(candidate) = self.active_candidate_mut() else { return };
        if !candidate.take_action(Action::Approve) {
            return;
        }
        let block = candidate.block.clone();
        let message = Message::Approve { sender: node_id, block };
        candidate.messages_approve.insert(node_id, message.clone());
        self.broadcast(&message, transport, now);
        self.time_approved = now;
    }

    pub(super) fn send_approve_status_update_once(&mut self, transport: &mut Transport, now: u64) {
        let node_id = self.node_id;
        let node_count = self.node_count;
        let Some(candidate) = self.active_candidate_mut() else { return };
        if candidate.has_taken(Action::ApproveStatusUpdate) {
            return;
        }
        if !enough_majority(candidate.messages_approve.len() as u64, node_count) {
            return;
        }
        if !candidate.take_action(Action::ApproveStatusUpdate) {
            return;
        }
        let block = candidate.block.clone();
        let evidence = candidate.messages_approve.clone();
        candidate.approve_status_updates.insert(node_id);
        let message = Message::ApproveStatusUpdate { sender: node_id, block, evidence };
        self.broadcast(&message, transport, now);
    }

    pub(super) fn send_vote_once(&mut self, transport: &mut Transport, now: u64) {
        let node_id = self.node_id;
        let node_count = self.node_count;
        let Some(candidate) = self.active_candidate_mut() else { return };
        if candidate.has_taken(Action::Vote) {
            return;
        }
        if !enough_majority(candidate.approve_status_updates.len() as u64, node_count) {
            return;
        }
        if !candidate.take_action(Action::Vote) {
            return;
        }
        let block = candidate.block.clone();
        let evidence = candidate.messages_approve.clone();
        candidate.messages_vote.insert(node_id, evidence.clone());
        let message = Message::Vote { sender: node_id, block, evidence };
        self.broadcast(&message, transport, now);
    }

    pub(super) fn send_vote_status_update_once(&mut self, transport: &mut Transport, now: u64) {
        let node_id = self.node_id;
        let node_count = self.node_count;
        let Some(candidate) = self.active_candidate_mut() else { return };
        if candidate.has_taken(Action::VoteStatusUpdate) {
            return;
        }
        if !enough_majority(candidate.messages_vote.len() as u64, node_count) {
            return;
        }
        if !candidate.take_action(Action::VoteStatusUpdate) {
            return;
        }
        let block = candidate.block.clone();
        let evidence = candidate.messages_vote.clone();
        candidate.vote_status_updates.insert(node_id);
        let message = Message::VoteStatusUpdate { sender: node_id, block, evidence };
        self.broadcast(&message, transport, now);
        self.check_and_forge(now);
    }
}
