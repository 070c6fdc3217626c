use crate::block::Block;
use crate::message::Message;
use crate::types::Action;

use super::*;

fn approve(sender: u64, block: Block) -> Message {
    Message::Approve { sender, block }
}

#[test]
fn take_action_gates_a_repeated_broadcast() {
    let mut candidate = Candidate::new(Block::new(1, Some(1), "body", 0));
    assert!(candidate.take_action(Action::Approve));
    assert!(!candidate.take_action(Action::Approve));
    assert!(candidate.has_taken(Action::Approve));
    assert!(!candidate.has_taken(Action::Vote));
}

#[test]
fn forged_candidate_outranks_any_non_forged_one() {
    let block = Block::new(1, Some(1), "body", 0);
    let mut loser = Candidate::new(block.clone());
    for i in 0..10 {
        loser.messages_approve.insert(i, approve(i, block.clone()));
    }
    let mut winner = Candidate::new(block);
    winner.forged = true;

    assert!(winner > loser);
}

#[test]
fn ordering_falls_through_evidence_sizes_in_round_order() {
    let block = Block::new(1, Some(1), "body", 0);
    let mut by_vote_status = Candidate::new(block.clone());
    by_vote_status.vote_status_updates.insert(1);

    let mut by_vote = Candidate::new(block.clone());
    by_vote.messages_vote.insert(1, EvidenceMap::new());
    by_vote.messages_vote.insert(2, EvidenceMap::new());

    // One vote_status_update outranks any number of plain votes.
    assert!(by_vote_status > by_vote);

    let mut by_approve_status = Candidate::new(block);
    by_approve_status.approve_status_updates.insert(1);
    by_approve_status.approve_status_updates.insert(2);
    by_approve_status.approve_status_updates.insert(3);

    assert!(by_vote > by_approve_status);
}
