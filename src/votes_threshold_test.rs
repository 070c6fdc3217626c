use test_case::test_case;

use super::*;

#[test_case(3, 4, true; "strict majority of four")]
#[test_case(2, 4, false; "exactly half of four is not enough")]
#[test_case(1, 4, false; "well under half of four")]
#[test_case(2, 3, true; "strict majority of three")]
#[test_case(1, 3, false; "under half of three")]
#[test_case(1, 1, true; "single node always meets its own majority")]
#[test_case(0, 0, false; "empty total never meets the threshold")]
fn majority_quorum(amount: u64, total: u64, expected: bool) {
    assert_eq!(enough_majority(amount, total), expected);
}

#[test]
#[should_panic(expected = "denominator must be greater than zero")]
fn zero_denominator_panics() {
    VotesThreshold::new(1, 0);
}

#[test]
#[should_panic(expected = "denominator must be >= numerator")]
fn numerator_exceeding_denominator_panics() {
    VotesThreshold::new(3, 2);
}
