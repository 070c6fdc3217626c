//! Quorum predicates.
//!
//! The prototype's four predicates disagreed on whether `enough_approves`
//! should be measured against `(N-1)/2` or `N/2`; this crate freezes all
//! four predicates to the `N/2` variant, the safer choice since it matches
//! the vote predicate and avoids a quorum that is one node's approve short
//! of a true majority once the proposer's own implicit approve is counted.

#[cfg(test)]
#[path = "votes_threshold_test.rs"]
mod votes_threshold_test;

/// A strict-majority-style threshold: `amount` meets the threshold against
/// `total` when `amount * denominator > total * numerator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotesThreshold {
    numerator: u64,
    denominator: u64,
}

/// `N/2` — used by all four quorum predicates.
pub const MAJORITY_QUORUM: VotesThreshold = VotesThreshold::new(1, 2);

impl VotesThreshold {
    const fn new(numerator: u64, denominator: u64) -> Self {
        assert!(denominator > 0, "denominator must be greater than zero");
        assert!(denominator >= numerator, "denominator must be >= numerator");
        Self { numerator, denominator }
    }

    /// `amount > total * numerator / denominator`, computed without floating point.
    pub fn is_met(&self, amount: u64, total: u64) -> bool {
        amount.checked_mul(self.denominator).expect("numeric overflow")
            > total.checked_mul(self.numerator).expect("numeric overflow")
    }
}

/// `enough_approves`, `enough_approve_status_updates`, `enough_votes`,
/// `enough_vote_status_updates`: all `|evidence| > node_count / 2`.
pub fn enough_majority(amount: u64, node_count: u64) -> bool {
    MAJORITY_QUORUM.is_met(amount, node_count)
}
