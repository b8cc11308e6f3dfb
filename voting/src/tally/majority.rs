//! Majority-family and unanimous tallies.

use plenum_types::ParticipantId;
use std::collections::{BTreeMap, HashMap};

use crate::ballot::{BallotBox, Choice};
use crate::proposal::Proposal;

use super::{ballot_weight, leaders, TallyOutcome, TallyResolution, SCORE_EPSILON};

/// Simple majority / supermajority: weight per single choice; the winner's
/// share of cast weight must strictly exceed the proposal's
/// `pass_threshold`.
///
/// An exact tie at the top is surfaced as `Tied` before the threshold is
/// consulted, so the tie-break policy decides it.
pub fn tally_majority(
    proposal: &Proposal,
    ballots: &BallotBox,
    weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    let mut cast_weight = 0.0;

    for ballot in ballots.iter() {
        let Choice::Single(label) = &ballot.choice else {
            continue;
        };
        let weight = ballot_weight(weights, &ballot.voter);
        *scores.entry(label.clone()).or_insert(0.0) += weight;
        cast_weight += weight;
    }

    let top = leaders(proposal, &scores);
    let resolution = match top.as_slice() {
        [] => TallyResolution::NoWinner,
        [single] => {
            let share = scores[single] / cast_weight;
            if share > proposal.pass_threshold {
                TallyResolution::Winner(single.clone())
            } else {
                TallyResolution::NoWinner
            }
        }
        _ => TallyResolution::Tied(top),
    };

    TallyOutcome { scores, resolution }
}

/// Unanimous: passes only when 100% of cast weight sits on one option with
/// zero opposing weight. Abstention (no ballot) never breaks unanimity.
pub fn tally_unanimous(
    ballots: &BallotBox,
    weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();

    for ballot in ballots.iter() {
        let Choice::Single(label) = &ballot.choice else {
            continue;
        };
        let weight = ballot_weight(weights, &ballot.voter);
        *scores.entry(label.clone()).or_insert(0.0) += weight;
    }

    let supported: Vec<&String> = scores
        .iter()
        .filter(|(_, score)| **score > SCORE_EPSILON)
        .map(|(label, _)| label)
        .collect();

    let resolution = match supported.as_slice() {
        [only] => TallyResolution::Winner((*only).clone()),
        _ => TallyResolution::NoWinner,
    };

    TallyOutcome { scores, resolution }
}
