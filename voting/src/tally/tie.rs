//! Tie-break policies.

use blake2::{Blake2b512, Digest};
use plenum_types::ProposalId;

use crate::ballot::{BallotBox, Choice};
use crate::proposal::{Proposal, TieBreakPolicy};

/// How a tie was resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum TieDecision {
    Winner(String),
    /// No usable preference resolved the tie; the proposal fails.
    NoWinner,
    /// The controller must open a runoff restricted to the tied options.
    Runoff,
}

/// Apply the proposal's tie-break policy to the tied options.
pub fn break_tie(proposal: &Proposal, tied: &[String], ballots: &BallotBox) -> TieDecision {
    match &proposal.tie_break {
        TieBreakPolicy::Reject => TieDecision::NoWinner,
        TieBreakPolicy::Revote => TieDecision::Runoff,
        TieBreakPolicy::Random => TieDecision::Winner(deterministic_pick(&proposal.id, tied)),
        TieBreakPolicy::DesignatedTieBreaker(designee) => {
            match ballots.get(designee) {
                Some(ballot) => match preference_among(&ballot.choice, tied) {
                    Some(label) => TieDecision::Winner(label),
                    None => TieDecision::NoWinner,
                },
                // The designee never voted; nothing to break the tie with.
                None => TieDecision::NoWinner,
            }
        }
    }
}

/// The designee's preference restricted to the tied options.
fn preference_among(choice: &Choice, tied: &[String]) -> Option<String> {
    match choice {
        Choice::Single(label) => tied.contains(label).then(|| label.clone()),
        Choice::Ranked(ranking) => ranking.iter().find(|l| tied.contains(l)).cloned(),
        Choice::Approval(approved) => {
            // Only decisive when exactly one tied option was approved.
            let mut hits = tied.iter().filter(|l| approved.contains(*l));
            let first = hits.next()?;
            hits.next().is_none().then(|| first.clone())
        }
        Choice::Quadratic(credits) => {
            // The tied option the designee backed with the most credits,
            // provided there is a unique maximum.
            let max = tied
                .iter()
                .filter_map(|l| credits.get(l))
                .copied()
                .max()
                .filter(|m| *m > 0)?;
            let mut at_max = tied.iter().filter(|l| credits.get(*l) == Some(&max));
            let first = at_max.next()?;
            at_max.next().is_none().then(|| first.clone())
        }
    }
}

/// Deterministic pick from the tie set, seeded by the proposal id and the
/// sorted tied labels so it is reproducible across runs and submission
/// orders.
fn deterministic_pick(proposal_id: &ProposalId, tied: &[String]) -> String {
    let mut sorted: Vec<&String> = tied.iter().collect();
    sorted.sort();

    let mut hasher = Blake2b512::new();
    hasher.update(proposal_id.as_str().as_bytes());
    for label in &sorted {
        hasher.update([0u8]);
        hasher.update(label.as_bytes());
    }
    let digest = hasher.finalize();
    let seed = u64::from_le_bytes(digest[..8].try_into().expect("digest is 64 bytes"));

    sorted[(seed % sorted.len() as u64) as usize].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::Ballot;
    use crate::proposal::{ProposalState, VotingMethod};
    use plenum_types::{ParticipantId, Timestamp};
    use std::collections::BTreeMap;

    fn proposal(policy: TieBreakPolicy) -> Proposal {
        Proposal {
            id: ProposalId::from("p"),
            title: "test".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            method: VotingMethod::Approval,
            quorum_threshold: 0.5,
            pass_threshold: 0.0,
            deadline: None,
            tie_break: policy,
            state: ProposalState::Open,
            created_at: Timestamp::EPOCH,
            opened_at: None,
            closed_at: None,
        }
    }

    fn tied() -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    fn ballot_of(voter: &str, choice: Choice) -> Ballot {
        Ballot {
            voter: ParticipantId::from(voter),
            choice,
            reasoning: None,
            cast_at: Timestamp::EPOCH,
        }
    }

    #[test]
    fn reject_never_picks() {
        let p = proposal(TieBreakPolicy::Reject);
        assert_eq!(
            break_tie(&p, &tied(), &BallotBox::new()),
            TieDecision::NoWinner
        );
    }

    #[test]
    fn revote_requests_runoff() {
        let p = proposal(TieBreakPolicy::Revote);
        assert_eq!(
            break_tie(&p, &tied(), &BallotBox::new()),
            TieDecision::Runoff
        );
    }

    #[test]
    fn random_is_deterministic_and_in_set() {
        let p = proposal(TieBreakPolicy::Random);
        let first = break_tie(&p, &tied(), &BallotBox::new());
        let second = break_tie(&p, &tied(), &BallotBox::new());
        assert_eq!(first, second);
        match first {
            TieDecision::Winner(label) => assert!(tied().contains(&label)),
            other => panic!("expected a winner, got {other:?}"),
        }
    }

    #[test]
    fn random_ignores_tie_set_ordering() {
        let p = proposal(TieBreakPolicy::Random);
        let forward = break_tie(&p, &["a".into(), "b".into()], &BallotBox::new());
        let backward = break_tie(&p, &["b".into(), "a".into()], &BallotBox::new());
        assert_eq!(forward, backward);
    }

    #[test]
    fn designee_single_choice_decides() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        let mut bbox = BallotBox::new();
        bbox.record(ballot_of("judge", Choice::Single("b".into())));

        assert_eq!(
            break_tie(&p, &tied(), &bbox),
            TieDecision::Winner("b".into())
        );
    }

    #[test]
    fn designee_choice_outside_tie_set_fails() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        let mut bbox = BallotBox::new();
        bbox.record(ballot_of("judge", Choice::Single("c".into())));

        assert_eq!(break_tie(&p, &tied(), &bbox), TieDecision::NoWinner);
    }

    #[test]
    fn designee_ranked_preference_decides() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        let mut bbox = BallotBox::new();
        bbox.record(ballot_of(
            "judge",
            Choice::Ranked(vec!["c".into(), "b".into(), "a".into()]),
        ));

        assert_eq!(
            break_tie(&p, &tied(), &bbox),
            TieDecision::Winner("b".into())
        );
    }

    #[test]
    fn designee_who_never_voted_cannot_break() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        assert_eq!(
            break_tie(&p, &tied(), &BallotBox::new()),
            TieDecision::NoWinner
        );
    }

    #[test]
    fn designee_ambiguous_approval_cannot_break() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        let mut bbox = BallotBox::new();
        bbox.record(ballot_of(
            "judge",
            Choice::Approval(["a".to_string(), "b".to_string()].into()),
        ));

        assert_eq!(break_tie(&p, &tied(), &bbox), TieDecision::NoWinner);
    }

    #[test]
    fn designee_quadratic_max_credits_decides() {
        let designee = ParticipantId::from("judge");
        let p = proposal(TieBreakPolicy::DesignatedTieBreaker(designee));
        let mut bbox = BallotBox::new();
        bbox.record(ballot_of(
            "judge",
            Choice::Quadratic(BTreeMap::from([
                ("a".to_string(), 2),
                ("b".to_string(), 7),
            ])),
        ));

        assert_eq!(
            break_tie(&p, &tied(), &bbox),
            TieDecision::Winner("b".into())
        );
    }
}
