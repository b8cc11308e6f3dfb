//! Quadratic voting.

use plenum_types::ParticipantId;
use std::collections::{BTreeMap, HashMap};

use crate::ballot::{BallotBox, Choice};

use super::{ballot_weight, TallyOutcome, TallyResolution, SCORE_EPSILON};

/// Credits are square-rooted into vote magnitude (`votes = sqrt(credits)`),
/// scaled by the voter's effective weight; the highest aggregate wins.
/// Spending 9 credits on one option yields 3 votes, not 9.
pub fn tally_quadratic(
    ballots: &BallotBox,
    weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();

    for ballot in ballots.iter() {
        let Choice::Quadratic(credits) = &ballot.choice else {
            continue;
        };
        let weight = ballot_weight(weights, &ballot.voter);
        for (label, amount) in credits {
            *scores.entry(label.clone()).or_insert(0.0) += (*amount as f64).sqrt() * weight;
        }
    }

    // No pass threshold: highest aggregate wins outright. Tied labels come
    // out in the score map's lexicographic order.
    let max = scores.values().cloned().fold(0.0_f64, f64::max);
    let resolution = if max <= 0.0 {
        TallyResolution::NoWinner
    } else {
        let tied: Vec<String> = scores
            .iter()
            .filter(|(_, score)| (max - **score).abs() < SCORE_EPSILON)
            .map(|(label, _)| label.clone())
            .collect();
        match tied.as_slice() {
            [single] => TallyResolution::Winner(single.clone()),
            _ => TallyResolution::Tied(tied),
        }
    };

    TallyOutcome { scores, resolution }
}
