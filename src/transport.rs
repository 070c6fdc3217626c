//! Central scheduled message queue with delay and loss simulation.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::message::{deep_copy, Message};
use crate::types::ValidatorId;

/// Per-node network characteristics, fixed once at construction.
#[derive(Debug, Clone, Copy)]
struct NodeCoords {
    x: f64,
    y: f64,
    /// Percentage points, `[0, 100]`.
    drop_rate: f64,
    /// `(0, 1]`.
    connection_speed: f64,
}

/// One scheduled delivery. Ordered for the heap by `deliver_time` ascending
/// (earliest due first), with ties broken by insertion order so a given run
/// is reproducible.
struct Envelope {
    message: Message,
    recipient: ValidatorId,
    send_time: u64,
    deliver_time: u64,
    sequence: u64,
}

/// A delivered message, handed to the [`crate::driver::Driver`].
pub struct Delivery {
    pub message: Message,
    pub recipient: ValidatorId,
}

/// Deterministic discrete-event transport. Uses a logical clock supplied by
/// the caller (the driver) rather than wall-clock time, so a run is fully
/// reproducible given the same seed.
pub struct Transport {
    delay_multiplier: f64,
    nodes: Vec<NodeCoords>,
    pool: BinaryHeap<Reverse<OrderedEnvelope>>,
    rng: StdRng,
    next_sequence: u64,
}

struct OrderedEnvelope(Envelope);

impl PartialEq for OrderedEnvelope {
    fn eq(&self, other: &Self) -> bool {
        (self.0.deliver_time, self.0.sequence) == (other.0.deliver_time, other.0.sequence)
    }
}
impl Eq for OrderedEnvelope {}
impl PartialOrd for OrderedEnvelope {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedEnvelope {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0.deliver_time, self.0.sequence).cmp(&(other.0.deliver_time, other.0.sequence))
    }
}

impl Transport {
    pub fn new(
        node_count: u64,
        max_distance: f64,
        lost_messages_percentage: f64,
        delay_multiplier: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let nodes = (0..node_count)
            .map(|_| NodeCoords {
                x: rng.gen_range(0.0..=max_distance),
                y: rng.gen_range(0.0..=max_distance),
                drop_rate: lost_messages_percentage,
                connection_speed: rng.gen_range(f64::MIN_POSITIVE..=1.0),
            })
            .collect();
        Self { delay_multiplier, nodes, pool: BinaryHeap::new(), rng, next_sequence: 0 }
    }

    fn distance(&self, a: usize, b: usize) -> f64 {
        let (ax, ay) = (self.nodes[a].x, self.nodes[a].y);
        let (bx, by) = (self.nodes[b].x, self.nodes[b].y);
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// `distance(a,b) * mean(speed_a, speed_b) * delay_multiplier`, rounded
    /// up to whole logical-clock ticks (at least 1, so a delivery is never
    /// scheduled in the same instant it was sent).
    pub fn connection_delay(&self, from: ValidatorId, to: ValidatorId) -> u64 {
        let (a, b) = (from as usize, to as usize);
        let distance = self.distance(a, b);
        let avg_speed = (self.nodes[a].connection_speed + self.nodes[b].connection_speed) / 2.0;
        let delay = distance * avg_speed * self.delay_multiplier;
        (delay.ceil() as u64).max(1)
    }

    fn drop_probability(&self, from: ValidatorId, to: ValidatorId) -> f64 {
        (self.nodes[from as usize].drop_rate + self.nodes[to as usize].drop_rate) / 2.0
    }

    /// Enqueue `message` for `recipient`, computing delivery time from `now`.
    /// Returns `false` if the message was dropped and never entered the queue.
    pub fn send(&mut self, message: &Message, recipient: ValidatorId, now: u64) -> bool {
        let from = message.sender();
        let roll: f64 = self.rng.gen_range(0.0..100.0);
        if roll < self.drop_probability(from, recipient) {
            tracing::debug!(from, to = recipient, kind = message.kind(), "message dropped");
            crate::metrics::record_dropped(message.kind());
            return false;
        }
        crate::metrics::record_sent(message.kind());

        let deliver_time = now + self.connection_delay(from, recipient);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pool.push(Reverse(OrderedEnvelope(Envelope {
            message: deep_copy(message),
            recipient,
            send_time: now,
            deliver_time,
            sequence,
        })));
        true
    }

    /// The earliest `deliver_time` still queued, if any — used by the
    /// driver to compute how far the logical clock can jump.
    pub fn next_deadline(&self) -> Option<u64> {
        self.pool.peek().map(|Reverse(e)| e.0.deliver_time)
    }

    /// Drain every envelope whose `deliver_time <= now`, in non-decreasing
    /// `deliver_time` order.
    pub fn receive(&mut self, now: u64) -> Vec<Delivery> {
        let mut due = Vec::new();
        while let Some(Reverse(envelope)) = self.pool.peek() {
            if envelope.0.deliver_time > now {
                break;
            }
            let Reverse(OrderedEnvelope(envelope)) = self.pool.pop().unwrap();
            crate::metrics::record_delivery_latency(envelope.message.kind(), envelope.deliver_time - envelope.send_time);
            due.push(Delivery { message: envelope.message, recipient: envelope.recipient });
        }
        due
    }
}
