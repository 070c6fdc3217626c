//! Catch-up protocol for a node that has fallen behind.

use tracing::instrument;

use crate::error::NodeError;
use crate::message::Message;
use crate::transport::Transport;

use super::Node;

impl Node {
    pub(super) fn request_chain_update(&mut self, transport: &mut Transport, now: u64) {
        let message = Message::ChainUpdateRequest { sender: self.node_id, last_block: self.last_block().cloned() };
        self.broadcast(&message, transport, now);
        self.time_update_requested = now;
    }

    /// Ask every peer for a catch-up once this node has been idle past
    /// `chain_update_timeout` — the fallback for a node that missed the
    /// messages that would otherwise have advanced it.
    pub(super) fn try_requesting_chain_update(&mut self, transport: &mut Transport, now: u64) {
        let idle = now.saturating_sub(self.last_activity_time());
        if idle < self.timings.chain_update_timeout {
            return;
        }
        self.request_chain_update(transport, now);
    }

    #[instrument(skip(self, transport, message), fields(node_id = self.node_id))]
    pub(super) fn receive_chain_update_request(
        &mut self,
        message: Message,
        transport: &mut Transport,
        now: u64,
    ) -> Result<(), NodeError> {
        let Message::ChainUpdateRequest { sender, last_block } = message else {
            unreachable!("caller only dispatches ChainUpdateRequest here")
        };
        let requester_next = last_block.map(|b| b.block_id + 1).unwrap_or(0) as usize;
        let chain = self.chain.get(requester_next.min(self.chain.len())..).unwrap_or(&[]).to_vec();
        let candidates = self
            .active_candidate
            .and_then(|(slot, _)| self.candidates.get(&slot).map(|manager| (slot, manager.clone())));
        let reply = Message::ChainUpdate { sender: self.node_id, chain, candidates };
        transport.send(&reply, sender, now);
        Ok(())
    }

    #[instrument(skip(self, message), fields(node_id = self.node_id))]
    pub(super) fn receive_chain_update(&mut self, message: Message, now: u64) -> Result<(), NodeError> {
        let Message::ChainUpdate { sender, chain, candidates } = message else {
            unreachable!("caller only dispatches ChainUpdate here")
        };
        for block in chain {
            if block.block_id == self.chain.len() as u64 {
                if !self.verify_block(&block) {
                    return Err(NodeError::MalformedMessage {
                        sender,
                        reason: format!("block {} from chain update fails the proposer rule", block.block_id),
                    });
                }
                self.chain.push(block);
            }
        }
        if let Some((slot, manager)) = candidates {
            let local = self.candidates.entry(slot).or_default();
            for candidate in manager.iter() {
                local.merge(candidate.clone());
            }
        }
        Ok(())
    }
}
