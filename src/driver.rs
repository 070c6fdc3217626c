//! Advances the logical clock and ferries deliveries between [`Transport`]
//! and [`Node`].

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::collections::HashSet;

use tracing::info;

use crate::node::Node;
use crate::transport::Transport;
use crate::types::ValidatorId;

/// Why a run stopped, reported by [`Driver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// More than half the nodes reached `generate_blocks` in their chain.
    QuorumReached { tick: u64 },
    /// `max_loop_iterations` elapsed without quorum.
    IterationLimit { tick: u64 },
}

/// Owns every [`Node`] and the shared [`Transport`] for one simulation run.
pub struct Driver {
    nodes: Vec<Node>,
    transport: Transport,
    generate_blocks: u64,
    max_loop_iterations: u64,
}

impl Driver {
    pub fn new(nodes: Vec<Node>, transport: Transport, generate_blocks: u64, max_loop_iterations: u64) -> Self {
        Self { nodes, transport, generate_blocks, max_loop_iterations }
    }

    fn quorum_reached(&self) -> bool {
        let caught_up = self.nodes.iter().filter(|n| n.chain.len() as u64 >= self.generate_blocks).count();
        caught_up * 2 > self.nodes.len()
    }

    /// Drive the simulation tick by tick until quorum or the iteration
    /// limit. Each tick jumps the logical clock to the next due deadline,
    /// delivers every envelope due at that instant, then calls `run` with no
    /// message on every node that received nothing this tick, so blank-block
    /// and chain-update timeouts still get a chance to fire.
    pub fn run(&mut self) -> Termination {
        let mut now = 0u64;
        for tick in 0..self.max_loop_iterations {
            let transport_deadline = self.transport.next_deadline();
            let timer_deadline = self.nodes.iter().map(Node::next_timer_deadline).min();
            let next = match (transport_deadline, timer_deadline) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => return Termination::IterationLimit { tick },
            };
            now = next.max(now);

            let deliveries = self.transport.receive(now);
            let mut touched: HashSet<ValidatorId> = HashSet::new();
            for delivery in deliveries {
                touched.insert(delivery.recipient);
                let Some(node) = self.nodes.get_mut(delivery.recipient as usize) else { continue };
                node.run(Some(delivery.message), &mut self.transport, now);
            }

            for node in self.nodes.iter_mut() {
                if !touched.contains(&node.node_id) {
                    node.run(None, &mut self.transport, now);
                }
            }

            metrics::gauge!(crate::metrics::TICK).set(now as f64);

            if self.quorum_reached() {
                info!(tick, now, "quorum reached, stopping");
                return Termination::QuorumReached { tick };
            }
        }
        info!(tick = self.max_loop_iterations, "iteration limit reached, stopping");
        Termination::IterationLimit { tick: self.max_loop_iterations }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
