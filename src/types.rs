//! Shared identifiers and small value types used across the crate.

use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Identifies a node. Nodes are numbered `0..node_count`, fixed for a run —
/// there is no dynamic membership (see spec Non-goals).
pub type ValidatorId = u64;

/// A slot position in the chain. Synonymous with `block_id`.
pub type Slot = u64;

/// The four gated emissions a [`crate::candidate::Candidate`] can take, in
/// protocol order. Gating each one through `actions_taken` prevents a
/// replayed precondition from causing a double broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Action {
    Approve,
    ApproveStatusUpdate,
    Vote,
    VoteStatusUpdate,
}
