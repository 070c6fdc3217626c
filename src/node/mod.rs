//! The per-node consensus state machine, the bulk of the crate.
//!
//! Split across sibling files the way the prototype split `node.py` into
//! `node_approve.py`, `node_vote.py`, `node_chain_update.py`, etc: this file
//! holds construction, the main `run` loop, and the small helpers every
//! other file shares; [`receive`], [`emit`], and [`chain_update`] hold the
//! three functional slices.

mod chain_update;
mod emit;
mod receive;

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::block::Block;
use crate::candidate::Candidate;
use crate::candidate_manager::CandidateManager;
use crate::error::NodeError;
use crate::message::Message;
use crate::transport::Transport;
use crate::types::{Slot, ValidatorId};

/// Timing/behaviour knobs carried over from [`crate::config::NodeConfig`],
/// kept as a separate struct so `Node::new`'s signature stays readable.
#[derive(Debug, Clone, Copy)]
pub struct NodeTimings {
    pub keep_excessive_messages: bool,
    pub blank_block_timeout: u64,
    pub chain_update_timeout: u64,
}

impl Default for NodeTimings {
    fn default() -> Self {
        Self { keep_excessive_messages: false, blank_block_timeout: 20, chain_update_timeout: 50 }
    }
}

/// One participant in the simulated chain. Holds no reference to sibling
/// nodes — only `node_count` — and never touches `Transport` except through
/// the handle passed into [`Node::run`].
#[derive(Debug)]
pub struct Node {
    pub node_id: ValidatorId,
    node_count: u64,
    pub chain: Vec<Block>,
    candidates: HashMap<Slot, CandidateManager>,
    /// `(slot, proposer)` identifying whichever Candidate is currently
    /// active for `next_slot` — an identity, not a borrow, so it can be
    /// looked up fresh via `find_by_proposer` each time.
    active_candidate: Option<(Slot, Option<ValidatorId>)>,
    /// Messages for a slot ahead of `next_slot`, kept sorted ascending so
    /// the lowest-slot message is drained first once it becomes current.
    messages_buffer: Vec<Message>,
    timings: NodeTimings,
    time_forged: u64,
    time_approved: u64,
    time_update_requested: u64,
}

impl Node {
    /// Construct a node with an optional starting chain. Returns
    /// [`NodeError::InvalidChain`] (fatal — this is the only path that ever
    /// produces it) if the chain is not dense from slot 0 or violates the
    /// proposer rule.
    pub fn new(
        node_id: ValidatorId,
        node_count: u64,
        chain: Vec<Block>,
        timings: NodeTimings,
        now: u64,
    ) -> Result<Self, NodeError> {
        Self::validate_chain(&chain, node_count)?;
        Ok(Self {
            node_id,
            node_count,
            chain,
            candidates: HashMap::new(),
            active_candidate: None,
            messages_buffer: Vec::new(),
            timings,
            time_forged: now,
            time_approved: now,
            time_update_requested: now,
        })
    }

    fn validate_chain(chain: &[Block], node_count: u64) -> Result<(), NodeError> {
        for (i, block) in chain.iter().enumerate() {
            let expected_id = i as u64;
            if block.block_id != expected_id {
                return Err(NodeError::InvalidChain {
                    reason: format!("block at index {i} has id {}, expected {expected_id}", block.block_id),
                });
            }
            if !block.satisfies_proposer_rule(node_count) {
                return Err(NodeError::InvalidChain {
                    reason: format!("block {} violates the proposer rule", block.block_id),
                });
            }
        }
        Ok(())
    }

    pub fn next_slot(&self) -> Slot {
        self.chain.len() as u64
    }

    pub fn next_slot_proposer(&self) -> ValidatorId {
        self.next_slot() % self.node_count
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Proposer rule plus the blank-block exception.
    fn verify_block(&self, block: &Block) -> bool {
        block.satisfies_proposer_rule(self.node_count) && block.block_id < u64::MAX
    }

    fn active_candidate(&self) -> Option<&Candidate> {
        let (slot, proposer) = self.active_candidate?;
        self.candidates.get(&slot)?.find_by_proposer(proposer)
    }

    fn active_candidate_mut(&mut self) -> Option<&mut Candidate> {
        let (slot, proposer) = self.active_candidate?;
        self.candidates.get_mut(&slot)?.find_by_proposer_mut(proposer)
    }

    /// `true` if this node has an active Candidate for `block`'s slot and it
    /// tracks a different block — the pre-forge race between (for example) a
    /// real proposer's block and a competing blank block.
    pub(super) fn conflicts_with_active_candidate(&self, block: &Block) -> bool {
        match self.active_candidate() {
            Some(active) => active.block.block_id == block.block_id && active.block != *block,
            None => false,
        }
    }

    fn manager_mut(&mut self, slot: Slot) -> &mut CandidateManager {
        self.candidates.entry(slot).or_default()
    }

    /// Fetch the Candidate for `block`, inserting a fresh one if this is the
    /// first message ever seen about it — a node may see an APPROVE before
    /// the COMMIT that justifies it, if COMMIT was dropped.
    fn candidate_or_insert(&mut self, block: &Block) -> &mut Candidate {
        let manager = self.manager_mut(block.block_id);
        if manager.find_by_block(block).is_none() {
            manager.insert(Candidate::new(block.clone()));
        }
        manager.find_by_block_mut(block).expect("just inserted")
    }

    /// Forge the active candidate once its `VOTE_STATUS_UPDATE` evidence
    /// reaches quorum, if it has not already forged.
    pub(super) fn check_and_forge(&mut self, now: u64) {
        let Some(candidate) = self.active_candidate() else { return };
        if candidate.forged {
            return;
        }
        if crate::votes_threshold::enough_majority(candidate.vote_status_updates.len() as u64, self.node_count) {
            self.forge(now);
        }
    }

    /// Pick the best candidate available for `next_slot`, if any. Called at
    /// the top of every [`Node::run`] so the rest of the tick sees an
    /// up-to-date view after whatever message (or buffered backlog) it just
    /// processed.
    fn refresh_active_candidate(&mut self) {
        let slot = self.next_slot();
        if let Some(manager) = self.candidates.get(&slot) {
            if let Some(best) = manager.best_candidate() {
                self.active_candidate = Some((slot, best.block.node_id));
                return;
            }
        }
        self.active_candidate = None;
    }

    /// The earliest instant at which one of this node's own timeouts
    /// (blank-block election or chain-update retry) could next fire, used by
    /// the driver to jump the logical clock straight to the next thing that
    /// can happen instead of ticking one unit at a time.
    pub fn next_timer_deadline(&self) -> u64 {
        self.last_activity_time() + self.timings.blank_block_timeout.min(self.timings.chain_update_timeout)
    }

    fn last_activity_time(&self) -> u64 {
        let mut latest = self.time_forged.max(self.time_approved).max(self.time_update_requested);
        if let Some(candidate) = self.active_candidate() {
            latest = latest.max(candidate.block.created);
        }
        latest
    }

    /// Main loop entry point, called once per tick by the
    /// [`crate::driver::Driver`]. `message` is `None` on ticks where this
    /// node received nothing.
    #[instrument(skip(self, transport), fields(node_id = self.node_id))]
    pub fn run(&mut self, message: Option<Message>, transport: &mut Transport, now: u64) {
        if let Some(message) = message {
            if let Err(err) = self.receive(message, transport, now) {
                self.log_receive_error(err);
            }
        }

        self.drain_buffer(transport, now);

        self.refresh_active_candidate();
        match self.active_candidate() {
            Some(_) => {
                self.send_approve_once(transport, now);
                self.send_approve_status_update_once(transport, now);
                self.send_vote_once(transport, now);
                self.send_vote_status_update_once(transport, now);
            }
            None => {
                let err = NodeError::NoCandidate { slot: self.next_slot() };
                debug!(node_id = self.node_id, error = %err, "no active candidate this tick, falling back to proposing or electing a blank block");
                self.gen_commit(transport, now);
                self.try_approving_blank_block(transport, now);
            }
        }

        self.try_requesting_chain_update(transport, now);
    }

    /// Drain buffered future-slot messages that have become current.
    fn drain_buffer(&mut self, transport: &mut Transport, now: u64) {
        loop {
            let next_slot = self.next_slot();
            let Some(pos) = self
                .messages_buffer
                .iter()
                .position(|m| m.referenced_block().map(|b| b.block_id) == Some(next_slot))
            else {
                break;
            };
            let message = self.messages_buffer.remove(pos);
            if let Err(err) = self.receive(message, transport, now) {
                self.log_receive_error(err);
            }
        }
    }

    /// `receive`'s future-slot case re-buffers the message rather than
    /// discarding it, so it gets a quieter log than every other error kind.
    fn log_receive_error(&self, err: NodeError) {
        match err {
            NodeError::NotReady { .. } => {
                debug!(node_id = self.node_id, error = %err, "message buffered for a future slot")
            }
            _ => warn!(node_id = self.node_id, error = %err, "discarding message"),
        }
    }

    fn buffer_message(&mut self, message: Message) {
        self.messages_buffer.push(message);
        self.messages_buffer.sort_by_key(|m| m.referenced_block().map(|b| b.block_id).unwrap_or(u64::MAX));
    }

    fn forge(&mut self, now: u64) {
        let Some((slot, proposer)) = self.active_candidate else { return };
        let Some(manager) = self.candidates.get_mut(&slot) else { return };
        let Some(candidate) = manager.find_by_proposer_mut(proposer) else { return };
        candidate.forged = true;
        let block = candidate.block.clone();
        info!(node_id = self.node_id, slot, proposer = ?proposer, "forged block");
        crate::metrics::record_forged();
        self.chain.push(block);
        self.active_candidate = None;
        self.time_forged = now;
        if !self.timings.keep_excessive_messages {
            self.candidates.remove(&slot);
        }
    }
}
