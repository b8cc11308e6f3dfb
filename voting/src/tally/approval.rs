//! Approval voting.

use plenum_types::ParticipantId;
use std::collections::{BTreeMap, HashMap};

use crate::ballot::{BallotBox, Choice};
use crate::proposal::Proposal;

use super::{ballot_weight, leaders, TallyOutcome, TallyResolution};

/// Every approved option receives the voter's full effective weight; the
/// highest total wins. A non-zero `pass_threshold` additionally demands a
/// minimum approval share (≥) of the participating weight, not just a
/// plurality.
pub fn tally_approval(
    proposal: &Proposal,
    ballots: &BallotBox,
    weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    let mut participating_weight = 0.0;

    for ballot in ballots.iter() {
        let Choice::Approval(approved) = &ballot.choice else {
            continue;
        };
        let weight = ballot_weight(weights, &ballot.voter);
        participating_weight += weight;
        for label in approved {
            *scores.entry(label.clone()).or_insert(0.0) += weight;
        }
    }

    let top = leaders(proposal, &scores);
    let resolution = match top.as_slice() {
        [] => TallyResolution::NoWinner,
        [single] => {
            let share = scores[single] / participating_weight;
            if proposal.pass_threshold > 0.0 && share < proposal.pass_threshold {
                TallyResolution::NoWinner
            } else {
                TallyResolution::Winner(single.clone())
            }
        }
        _ => TallyResolution::Tied(top),
    };

    TallyOutcome { scores, resolution }
}
