//! Tally engine — pure functions converting ballots and effective weights
//! into per-option scores and a winner.
//!
//! One implementation per method; they share nothing but the input/output
//! contract, so dispatch is a closed match over [`VotingMethod`]. Ties are
//! always surfaced explicitly — the engine never silently picks an
//! arbitrary winner.

mod approval;
mod majority;
mod quadratic;
mod ranked;
mod tie;

pub use tie::{break_tie, TieDecision};

use plenum_types::ParticipantId;
use std::collections::{BTreeMap, HashMap};

use crate::ballot::BallotBox;
use crate::proposal::{Proposal, VotingMethod};

/// Tolerance for comparing f64 scores when detecting ties.
pub const SCORE_EPSILON: f64 = 1e-9;

/// How a tally run resolved, before tie-break policy is applied.
#[derive(Clone, Debug, PartialEq)]
pub enum TallyResolution {
    Winner(String),
    /// The leading options hold exactly equal weight. Sorted by the
    /// proposal's option order.
    Tied(Vec<String>),
    /// No option cleared the method's bar.
    NoWinner,
}

/// Scores plus resolution for one tally run.
#[derive(Clone, Debug)]
pub struct TallyOutcome {
    pub scores: BTreeMap<String, f64>,
    pub resolution: TallyResolution,
}

/// Run the proposal's configured method over the ballots.
///
/// `effective_weights` must already reflect delegation; the tally itself
/// knows nothing about the graph.
pub fn tally(
    proposal: &Proposal,
    ballots: &BallotBox,
    effective_weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    match proposal.method {
        VotingMethod::SimpleMajority | VotingMethod::Supermajority => {
            majority::tally_majority(proposal, ballots, effective_weights)
        }
        VotingMethod::Unanimous => majority::tally_unanimous(ballots, effective_weights),
        VotingMethod::RankedChoice => ranked::tally_ranked(proposal, ballots, effective_weights),
        VotingMethod::Approval => approval::tally_approval(proposal, ballots, effective_weights),
        VotingMethod::Quadratic => quadratic::tally_quadratic(ballots, effective_weights),
    }
}

/// Weight of one ballot's voter. Voters absent from the map carry nothing.
fn ballot_weight(weights: &HashMap<ParticipantId, f64>, voter: &ParticipantId) -> f64 {
    weights.get(voter).copied().unwrap_or(0.0)
}

/// Options whose score is within [`SCORE_EPSILON`] of the maximum, in the
/// proposal's option order. Empty when no option scored above zero.
fn leaders(proposal: &Proposal, scores: &BTreeMap<String, f64>) -> Vec<String> {
    let max = scores.values().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mut tied: Vec<String> = scores
        .iter()
        .filter(|(_, score)| (max - **score).abs() < SCORE_EPSILON)
        .map(|(label, _)| label.clone())
        .collect();
    tied.sort_by_key(|label| proposal.option_index(label));
    tied
}
