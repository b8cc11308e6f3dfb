//! The immutable outcome of a tallied proposal.

use plenum_types::{ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::proposal::VotingMethod;

/// Created exactly once, at the `Open → Tallied` transition, and never
/// mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalResult {
    pub proposal_id: ProposalId,
    pub method: VotingMethod,
    /// Whether participation weight reached the quorum threshold at close
    /// time. When false, `winner` is always `None` regardless of scores.
    pub quorum_met: bool,
    pub winner: Option<String>,
    /// Per-option scores as produced by the method.
    pub tally_detail: BTreeMap<String, f64>,
    /// Weight that participated, directly or via delegation.
    pub participation_weight: f64,
    /// Total eligible weight, read from the registry at close time.
    pub total_eligible_weight: f64,
    /// Set when a `Revote` tie-break spawned a runoff proposal.
    pub runoff: Option<ProposalId>,
    pub decided_at: Timestamp,
}
