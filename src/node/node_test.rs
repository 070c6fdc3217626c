use assert_matches::assert_matches;
use rstest::rstest;

use crate::block::Block;
use crate::error::NodeError;
use crate::message::{Message, MessagesChain};
use crate::transport::Transport;
use crate::types::Action;

use super::*;

fn node(node_id: ValidatorId, node_count: u64) -> Node {
    Node::new(node_id, node_count, Vec::new(), NodeTimings::default(), 0).unwrap()
}

fn transport(node_count: u64) -> Transport {
    Transport::new(node_count, 10.0, 0.0, 1.0, 1)
}

#[test]
fn new_accepts_an_empty_chain() {
    assert!(Node::new(0, 4, Vec::new(), NodeTimings::default(), 0).is_ok());
}

#[test]
fn new_rejects_a_chain_with_a_gap() {
    let chain = vec![Block::new(1, Some(1), "body", 0)];
    let err = Node::new(0, 4, chain, NodeTimings::default(), 0).unwrap_err();
    assert_matches!(err, NodeError::InvalidChain { .. });
}

#[test]
fn new_rejects_a_chain_that_violates_the_proposer_rule() {
    let chain = vec![Block::new(0, Some(2), "body", 0)];
    let err = Node::new(0, 4, chain, NodeTimings::default(), 0).unwrap_err();
    assert_matches!(err, NodeError::InvalidChain { .. });
}

#[test]
fn receive_commit_creates_a_candidate() {
    let mut n = node(1, 4);
    let mut t = transport(4);
    let block = Block::new(0, Some(0), "body", 0);
    n.receive(Message::Commit { sender: 0, block: block.clone() }, &mut t, 0).unwrap();
    n.refresh_active_candidate();
    assert_eq!(n.active_candidate().unwrap().block, block);
}

#[test]
fn malformed_block_is_rejected() {
    let mut n = node(1, 4);
    let mut t = transport(4);
    // Block at slot 0 claims a proposer other than node 0 — violates the proposer rule.
    let bad_block = Block::new(0, Some(2), "body", 0);
    let err = n.receive(Message::Commit { sender: 2, block: bad_block }, &mut t, 0).unwrap_err();
    assert_matches!(err, NodeError::MalformedMessage { .. });
}

#[test]
fn future_slot_message_is_buffered_and_triggers_a_chain_update_request() {
    let mut n = node(1, 4);
    let mut t = transport(4);
    let future_block = Block::new(5, Some(1), "body", 0);
    let err = n.receive(Message::Commit { sender: 1, block: future_block }, &mut t, 0).unwrap_err();
    assert_matches!(err, NodeError::NotReady { slot: 5, next_slot: 0 });
    assert_eq!(n.messages_buffer.len(), 1);
    assert!(t.next_deadline().is_some());
}

#[test]
fn approve_quorum_triggers_an_approve_status_update() {
    let mut n = node(0, 4);
    let mut t = transport(4);
    let block = Block::new(0, Some(0), "body", 0);
    n.receive(Message::Commit { sender: 0, block: block.clone() }, &mut t, 0).unwrap();
    for sender in [1, 2] {
        n.receive(Message::Approve { sender, block: block.clone() }, &mut t, 0).unwrap();
    }
    n.refresh_active_candidate();
    n.send_approve_once(&mut t, 0);
    n.send_approve_status_update_once(&mut t, 0);
    let candidate = n.active_candidate().unwrap();
    assert!(candidate.has_taken(Action::ApproveStatusUpdate));
}

#[test]
fn approve_is_dropped_once_any_candidate_for_the_slot_sent_approve_status_update() {
    let mut n = node(0, 4);
    let mut t = transport(4);
    let block = Block::new(0, Some(0), "body", 0);
    n.receive(Message::Commit { sender: 0, block: block.clone() }, &mut t, 0).unwrap();
    for sender in [1, 2] {
        n.receive(Message::Approve { sender, block: block.clone() }, &mut t, 0).unwrap();
    }
    n.refresh_active_candidate();
    n.send_approve_once(&mut t, 0);
    n.send_approve_status_update_once(&mut t, 0);
    assert!(n.active_candidate().unwrap().has_taken(Action::ApproveStatusUpdate));

    // A late approve for the same block must now be dropped rather than recorded.
    n.receive(Message::Approve { sender: 3, block: block.clone() }, &mut t, 0).unwrap();
    assert!(!n.active_candidate().unwrap().messages_approve.contains_key(&3));
}

#[test]
fn status_update_for_a_different_block_than_the_active_candidate_is_rejected() {
    let mut n = node(2, 4);
    let mut t = transport(4);
    let real = Block::new(0, Some(0), "real proposer block", 0);
    let blank = Block::blank(0, 0);

    n.receive(Message::Commit { sender: 0, block: real.clone() }, &mut t, 0).unwrap();
    n.refresh_active_candidate();
    assert_eq!(n.active_candidate().unwrap().block, real, "the real block wins best_candidate when it exists alone");

    // A status update racing in for the competing blank block must be
    // rejected rather than silently starting a second Candidate to merge into.
    let mut evidence = MessagesChain::new();
    for sender in [0, 1, 3] {
        evidence.insert(sender, Message::Approve { sender, block: blank.clone() });
    }
    let err = n
        .receive(Message::ApproveStatusUpdate { sender: 1, block: blank.clone(), evidence: evidence.clone() }, &mut t, 0)
        .unwrap_err();
    assert_matches!(err, NodeError::ConflictingBlock { sender: 1, slot: 0 });

    let mut vote_evidence = std::collections::HashMap::new();
    for sender in [0, 1, 3] {
        vote_evidence.insert(sender, evidence.clone());
    }
    let err = n
        .receive(
            Message::VoteStatusUpdate { sender: 1, block: blank.clone(), evidence: vote_evidence },
            &mut t,
            0,
        )
        .unwrap_err();
    assert_matches!(err, NodeError::ConflictingBlock { sender: 1, slot: 0 });
}

#[test]
fn full_round_forges_once_vote_status_quorum_is_reached() {
    let mut n = node(0, 4);
    let mut t = transport(4);
    let block = Block::new(0, Some(0), "body", 0);
    n.receive(Message::Commit { sender: 0, block: block.clone() }, &mut t, 0).unwrap();
    n.refresh_active_candidate();

    // Quorum for N=4 is ">|N|/2", i.e. at least 3 — nodes 0, 1, 2 suffice.
    let mut approve_evidence = MessagesChain::new();
    for sender in [0, 1, 2] {
        approve_evidence.insert(sender, Message::Approve { sender, block: block.clone() });
    }

    n.send_approve_once(&mut t, 0);
    for sender in [1, 2] {
        n.receive(Message::Approve { sender, block: block.clone() }, &mut t, 0).unwrap();
    }
    n.send_approve_status_update_once(&mut t, 0);
    for sender in [1, 2] {
        n.receive(
            Message::ApproveStatusUpdate { sender, block: block.clone(), evidence: approve_evidence.clone() },
            &mut t,
            0,
        )
        .unwrap();
    }
    n.send_vote_once(&mut t, 0);
    for sender in [1, 2] {
        n.receive(Message::Vote { sender, block: block.clone(), evidence: approve_evidence.clone() }, &mut t, 0)
            .unwrap();
    }
    n.send_vote_status_update_once(&mut t, 0);

    let mut vote_evidence = std::collections::HashMap::new();
    for sender in [0, 1, 2] {
        vote_evidence.insert(sender, approve_evidence.clone());
    }
    for sender in [1, 2] {
        n.receive(
            Message::VoteStatusUpdate { sender, block: block.clone(), evidence: vote_evidence.clone() },
            &mut t,
            0,
        )
        .unwrap();
    }

    assert_eq!(n.chain, vec![block]);
}

#[test]
fn blank_block_is_nominated_after_the_timeout_elapses() {
    let mut n = node(1, 4);
    let mut t = transport(4);
    n.run(None, &mut t, 0);
    n.run(None, &mut t, n.timings.blank_block_timeout);
    n.refresh_active_candidate();
    assert_eq!(n.active_candidate().unwrap().block.node_id, None);
}

/// The round transition from APPROVE to APPROVE_STATUS_UPDATE fires exactly
/// at majority, across a handful of cluster sizes: one approve short never
/// crosses the threshold, the next one always does.
#[rstest]
#[case(3, 2)]
#[case(4, 3)]
#[case(5, 3)]
#[case(7, 4)]
fn approve_status_update_fires_exactly_at_majority(#[case] node_count: u64, #[case] quorum: usize) {
    let mut n = node(0, node_count);
    let mut t = transport(node_count);
    let block = Block::new(0, Some(0), "body", 0);
    n.receive(Message::Commit { sender: 0, block: block.clone() }, &mut t, 0).unwrap();
    n.refresh_active_candidate();
    n.send_approve_once(&mut t, 0);

    let mut sender = 1;
    for _ in 0..(quorum - 2) {
        n.receive(Message::Approve { sender, block: block.clone() }, &mut t, 0).unwrap();
        sender += 1;
    }
    n.send_approve_status_update_once(&mut t, 0);
    assert!(
        !n.active_candidate().unwrap().has_taken(Action::ApproveStatusUpdate),
        "N={node_count}: should not fire one approve short of quorum {quorum}"
    );

    n.receive(Message::Approve { sender, block: block.clone() }, &mut t, 0).unwrap();
    n.send_approve_status_update_once(&mut t, 0);
    assert!(
        n.active_candidate().unwrap().has_taken(Action::ApproveStatusUpdate),
        "N={node_count}: should fire exactly at quorum {quorum}"
    );
}

#[test]
fn chain_update_request_carries_the_last_committed_block() {
    let mut n = node(1, 4);
    let mut t = transport(4);
    n.request_chain_update(&mut t, 0);
    let deliveries = t.receive(u64::MAX);
    assert_eq!(deliveries.len(), 3);
    assert_matches!(&deliveries[0].message, Message::ChainUpdateRequest { last_block: None, .. });
}
