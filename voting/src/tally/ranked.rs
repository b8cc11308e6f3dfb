//! Ranked choice — weighted instant-runoff.

use plenum_types::ParticipantId;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ballot::{BallotBox, Choice};
use crate::proposal::Proposal;

use super::{ballot_weight, TallyOutcome, TallyResolution, SCORE_EPSILON};

/// Instant-runoff over ranked ballots.
///
/// Each round counts every ballot's weight toward its highest-ranked option
/// still in the running. An option holding a strict majority of the active
/// weight wins. Otherwise the option with the least weight is eliminated
/// and its ballots transfer to their next remaining preference; ballots
/// with no remaining preference are exhausted and leave the active weight.
///
/// Depends only on ballot content, never on submission order: round counts
/// are sums over the full ballot set, and elimination ties are broken by
/// the proposal's declared option order (last-declared eliminated first).
pub fn tally_ranked(
    proposal: &Proposal,
    ballots: &BallotBox,
    weights: &HashMap<ParticipantId, f64>,
) -> TallyOutcome {
    let mut remaining: HashSet<&str> = proposal.options.iter().map(String::as_str).collect();

    loop {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        let mut active_weight = 0.0;

        for ballot in ballots.iter() {
            let Choice::Ranked(ranking) = &ballot.choice else {
                continue;
            };
            let Some(preference) = ranking
                .iter()
                .find(|label| remaining.contains(label.as_str()))
            else {
                continue; // exhausted
            };
            let weight = ballot_weight(weights, &ballot.voter);
            *counts.entry(preference.clone()).or_insert(0.0) += weight;
            active_weight += weight;
        }

        if active_weight <= 0.0 {
            return TallyOutcome {
                scores: final_scores(proposal, &counts),
                resolution: TallyResolution::NoWinner,
            };
        }

        let max = counts.values().cloned().fold(0.0_f64, f64::max);
        let min = counts
            .iter()
            .filter(|(label, _)| remaining.contains(label.as_str()))
            .map(|(_, c)| *c)
            .fold(f64::INFINITY, f64::min);

        // Strict majority of the remaining active weight wins outright.
        if max > active_weight / 2.0 {
            let winner = counts
                .iter()
                .find(|(_, count)| (max - **count).abs() < SCORE_EPSILON)
                .map(|(label, _)| label.clone())
                .unwrap_or_default();
            return TallyOutcome {
                scores: final_scores(proposal, &counts),
                resolution: TallyResolution::Winner(winner),
            };
        }

        // Everything left is level: a genuine tie for the policy to decide.
        // Covers the two-options-at-exactly-half case as well.
        let supported: Vec<&String> = counts.keys().collect();
        if supported.len() > 1 && (max - min).abs() < SCORE_EPSILON {
            let mut tied: Vec<String> = supported.into_iter().cloned().collect();
            tied.sort_by_key(|label| proposal.option_index(label));
            return TallyOutcome {
                scores: final_scores(proposal, &counts),
                resolution: TallyResolution::Tied(tied),
            };
        }

        // Eliminate the weakest remaining option. Options with zero
        // first-preference weight go first; among equals, the one declared
        // latest in the proposal's option order.
        let eliminated = remaining
            .iter()
            .map(|label| (*label, counts.get(*label).copied().unwrap_or(0.0)))
            .min_by(|(a_label, a_count), (b_label, b_count)| {
                a_count
                    .partial_cmp(b_count)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        // Reverse declaration order: later option loses.
                        proposal
                            .option_index(b_label)
                            .cmp(&proposal.option_index(a_label))
                    })
            })
            .map(|(label, _)| label.to_string());

        match eliminated {
            Some(label) if remaining.len() > 1 => {
                remaining.remove(label.as_str());
            }
            _ => {
                // Single remaining option without majority: the rest of the
                // weight is exhausted, so it wins what is left.
                let winner = remaining.iter().next().map(|s| s.to_string());
                return TallyOutcome {
                    scores: final_scores(proposal, &counts),
                    resolution: match winner {
                        Some(w) => TallyResolution::Winner(w),
                        None => TallyResolution::NoWinner,
                    },
                };
            }
        }
    }
}

/// Last-round counts, padded with zeros for options eliminated earlier.
fn final_scores(proposal: &Proposal, counts: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let mut scores = counts.clone();
    for option in &proposal.options {
        scores.entry(option.clone()).or_insert(0.0);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::Ballot;
    use crate::proposal::{ProposalState, TieBreakPolicy, VotingMethod};
    use plenum_types::{ProposalId, Timestamp};

    fn proposal(options: &[&str]) -> Proposal {
        Proposal {
            id: ProposalId::from("p"),
            title: "test".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            method: VotingMethod::RankedChoice,
            quorum_threshold: 0.5,
            pass_threshold: 0.0,
            deadline: None,
            tie_break: TieBreakPolicy::Reject,
            state: ProposalState::Open,
            created_at: Timestamp::EPOCH,
            opened_at: None,
            closed_at: None,
        }
    }

    fn rank(bbox: &mut BallotBox, voter: &str, ranking: &[&str]) {
        bbox.record(Ballot {
            voter: ParticipantId::from(voter),
            choice: Choice::Ranked(ranking.iter().map(|s| s.to_string()).collect()),
            reasoning: None,
            cast_at: Timestamp::EPOCH,
        });
    }

    fn unit_weights(n: usize) -> HashMap<ParticipantId, f64> {
        (0..n)
            .map(|i| (ParticipantId::from(format!("v{i}").as_str()), 1.0))
            .collect()
    }

    #[test]
    fn first_round_majority_wins_immediately() {
        let p = proposal(&["a", "b", "c"]);
        let mut bbox = BallotBox::new();
        rank(&mut bbox, "v0", &["a", "b"]);
        rank(&mut bbox, "v1", &["a", "c"]);
        rank(&mut bbox, "v2", &["b", "a"]);

        let outcome = tally_ranked(&p, &bbox, &unit_weights(3));
        assert_eq!(outcome.resolution, TallyResolution::Winner("a".into()));
    }

    #[test]
    fn elimination_redistributes_to_next_preference() {
        // First prefs: a=2, b=2, c=1. c eliminated, its ballot flows to b,
        // making b the majority holder.
        let p = proposal(&["a", "b", "c"]);
        let mut bbox = BallotBox::new();
        rank(&mut bbox, "v0", &["a"]);
        rank(&mut bbox, "v1", &["a"]);
        rank(&mut bbox, "v2", &["b"]);
        rank(&mut bbox, "v3", &["b"]);
        rank(&mut bbox, "v4", &["c", "b"]);

        let outcome = tally_ranked(&p, &bbox, &unit_weights(5));
        assert_eq!(outcome.resolution, TallyResolution::Winner("b".into()));
        assert_eq!(outcome.scores["b"], 3.0);
        assert_eq!(outcome.scores["c"], 0.0);
    }

    #[test]
    fn exhausted_ballots_leave_active_weight() {
        // v4 only ranks c; once c is out their weight is exhausted and b
        // needs a majority of the remaining 4, not of 5.
        let p = proposal(&["a", "b", "c"]);
        let mut bbox = BallotBox::new();
        rank(&mut bbox, "v0", &["a"]);
        rank(&mut bbox, "v1", &["b"]);
        rank(&mut bbox, "v2", &["b"]);
        rank(&mut bbox, "v3", &["b"]);
        rank(&mut bbox, "v4", &["c"]);

        let outcome = tally_ranked(&p, &bbox, &unit_weights(5));
        assert_eq!(outcome.resolution, TallyResolution::Winner("b".into()));
    }

    #[test]
    fn two_way_exact_tie_is_surfaced() {
        let p = proposal(&["a", "b"]);
        let mut bbox = BallotBox::new();
        rank(&mut bbox, "v0", &["a"]);
        rank(&mut bbox, "v1", &["b"]);

        let outcome = tally_ranked(&p, &bbox, &unit_weights(2));
        assert_eq!(
            outcome.resolution,
            TallyResolution::Tied(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn weighted_ballots_count_by_weight() {
        let p = proposal(&["a", "b"]);
        let mut bbox = BallotBox::new();
        rank(&mut bbox, "v0", &["a"]);
        rank(&mut bbox, "v1", &["b"]);

        let mut weights = unit_weights(2);
        weights.insert(ParticipantId::from("v1"), 5.0);

        let outcome = tally_ranked(&p, &bbox, &weights);
        assert_eq!(outcome.resolution, TallyResolution::Winner("b".into()));
    }

    #[test]
    fn no_ballots_no_winner() {
        let p = proposal(&["a", "b"]);
        let outcome = tally_ranked(&p, &BallotBox::new(), &HashMap::new());
        assert_eq!(outcome.resolution, TallyResolution::NoWinner);
    }

    #[test]
    fn elimination_order_does_not_depend_on_submission_order() {
        let p = proposal(&["a", "b", "c"]);
        let ballots: Vec<(&str, Vec<&str>)> = vec![
            ("v0", vec!["a", "c"]),
            ("v1", vec!["b", "c"]),
            ("v2", vec!["c", "a"]),
            ("v3", vec!["a"]),
            ("v4", vec!["b", "a"]),
        ];
        let weights = unit_weights(5);

        let mut forward = BallotBox::new();
        for (voter, ranking) in &ballots {
            rank(&mut forward, voter, ranking);
        }
        let mut backward = BallotBox::new();
        for (voter, ranking) in ballots.iter().rev() {
            rank(&mut backward, voter, ranking);
        }

        let a = tally_ranked(&p, &forward, &weights);
        let b = tally_ranked(&p, &backward, &weights);
        assert_eq!(a.resolution, b.resolution);
        assert_eq!(a.scores, b.scores);
    }
}
