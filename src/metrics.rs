//! Counters and gauges describing a running simulation, via the standalone
//! `metrics` crate (the publishable equivalent of the teacher's internal
//! `apollo_metrics` macro layer — see DESIGN.md).

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};

/// Register descriptions once, mirroring `register_metrics()` in the
/// teacher's `manager.rs`. Call before installing a recorder.
pub fn describe() {
    describe_counter!(MESSAGES_SENT, "messages handed to the transport, by kind");
    describe_counter!(MESSAGES_DROPPED, "messages dropped in transit by the transport");
    describe_counter!(BLOCKS_FORGED, "blocks forged across all nodes");
    describe_gauge!(TICK, "current logical clock tick of the driver");
    describe_histogram!(DELIVERY_LATENCY, "ticks elapsed between send and delivery for a message");
}

pub const MESSAGES_SENT: &str = "simplex_consensus_messages_sent_total";
pub const MESSAGES_DROPPED: &str = "simplex_consensus_messages_dropped_total";
pub const BLOCKS_FORGED: &str = "simplex_consensus_blocks_forged_total";
pub const TICK: &str = "simplex_consensus_tick";
pub const DELIVERY_LATENCY: &str = "simplex_consensus_delivery_latency_ticks";

pub fn record_sent(kind: &'static str) {
    counter!(MESSAGES_SENT, "kind" => kind).increment(1);
}

pub fn record_dropped(kind: &'static str) {
    counter!(MESSAGES_DROPPED, "kind" => kind).increment(1);
}

pub fn record_forged() {
    counter!(BLOCKS_FORGED).increment(1);
}

pub fn record_delivery_latency(kind: &'static str, ticks: u64) {
    histogram!(DELIVERY_LATENCY, "kind" => kind).record(ticks as f64);
}
