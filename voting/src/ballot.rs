//! Ballots — one live choice per participant per proposal.
//!
//! The choice shape depends on the proposal's tally method and is validated
//! before anything is stored. A re-vote before close supersedes the prior
//! ballot; the supersession is reported to the caller so it can be audited,
//! never silently overwritten.

use plenum_types::{ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::VotingError;
use crate::proposal::{Proposal, VotingMethod};

/// A voter's expressed choice, shaped by the proposal's method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// One option label (majority family, unanimous).
    Single(String),
    /// Preference order over a subset of the options, best first.
    Ranked(Vec<String>),
    /// The set of approved options.
    Approval(BTreeSet<String>),
    /// Credits allocated per option; square-rooted at tally time.
    Quadratic(BTreeMap<String, u64>),
}

/// One recorded ballot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: ParticipantId,
    pub choice: Choice,
    /// Free-text justification, surfaced in the audit trail.
    pub reasoning: Option<String>,
    pub cast_at: Timestamp,
}

/// Validate a choice's shape against the proposal's method and options.
///
/// `credit_budget` bounds the total credits of a quadratic ballot.
pub fn validate_choice(
    proposal: &Proposal,
    choice: &Choice,
    credit_budget: u64,
) -> Result<(), VotingError> {
    match (proposal.method, choice) {
        (
            VotingMethod::SimpleMajority | VotingMethod::Supermajority | VotingMethod::Unanimous,
            Choice::Single(label),
        ) => {
            if !proposal.has_option(label) {
                return Err(VotingError::InvalidChoice(format!(
                    "ballot choice references unknown option: {label}"
                )));
            }
            Ok(())
        }
        (VotingMethod::RankedChoice, Choice::Ranked(ranking)) => {
            if ranking.is_empty() {
                return Err(VotingError::InvalidChoice(
                    "ranked ballot must rank at least one option".into(),
                ));
            }
            let mut seen = HashSet::new();
            for label in ranking {
                if !proposal.has_option(label) {
                    return Err(VotingError::InvalidChoice(format!(
                        "ballot choice references unknown option: {label}"
                    )));
                }
                if !seen.insert(label.as_str()) {
                    return Err(VotingError::InvalidChoice(format!(
                        "ranked ballot lists {label} more than once"
                    )));
                }
            }
            Ok(())
        }
        (VotingMethod::Approval, Choice::Approval(approved)) => {
            if approved.is_empty() {
                return Err(VotingError::InvalidChoice(
                    "approval ballot must approve at least one option".into(),
                ));
            }
            for label in approved {
                if !proposal.has_option(label) {
                    return Err(VotingError::InvalidChoice(format!(
                        "ballot choice references unknown option: {label}"
                    )));
                }
            }
            Ok(())
        }
        (VotingMethod::Quadratic, Choice::Quadratic(credits)) => {
            if credits.is_empty() {
                return Err(VotingError::InvalidChoice(
                    "quadratic ballot must allocate credits to at least one option".into(),
                ));
            }
            let mut total = 0u64;
            for (label, amount) in credits {
                if !proposal.has_option(label) {
                    return Err(VotingError::InvalidChoice(format!(
                        "ballot choice references unknown option: {label}"
                    )));
                }
                total = total.saturating_add(*amount);
            }
            if total > credit_budget {
                return Err(VotingError::InvalidChoice(format!(
                    "quadratic ballot spends {total} credits, budget is {credit_budget}"
                )));
            }
            Ok(())
        }
        (method, _) => Err(VotingError::InvalidChoice(format!(
            "ballot shape does not match the {method} method"
        ))),
    }
}

/// Latest live ballot per voter for one proposal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BallotBox {
    ballots: HashMap<ParticipantId, Ballot>,
}

impl BallotBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ballot, returning the superseded one if the voter had
    /// already voted.
    pub fn record(&mut self, ballot: Ballot) -> Option<Ballot> {
        self.ballots.insert(ballot.voter.clone(), ballot)
    }

    pub fn get(&self, voter: &ParticipantId) -> Option<&Ballot> {
        self.ballots.get(voter)
    }

    /// Ids of everyone who has a live ballot.
    pub fn voters(&self) -> HashSet<ParticipantId> {
        self.ballots.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ballot> {
        self.ballots.values()
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ProposalState, TieBreakPolicy};
    use plenum_types::ProposalId;

    fn proposal(method: VotingMethod, options: &[&str]) -> Proposal {
        Proposal {
            id: ProposalId::from("p"),
            title: "test".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            method,
            quorum_threshold: 0.5,
            pass_threshold: method.default_pass_threshold(),
            deadline: None,
            tie_break: TieBreakPolicy::Reject,
            state: ProposalState::Open,
            created_at: Timestamp::EPOCH,
            opened_at: Some(Timestamp::EPOCH),
            closed_at: None,
        }
    }

    fn ballot(voter: &str, choice: Choice, at: u64) -> Ballot {
        Ballot {
            voter: ParticipantId::from(voter),
            choice,
            reasoning: None,
            cast_at: Timestamp::new(at),
        }
    }

    #[test]
    fn single_choice_must_name_known_option() {
        let p = proposal(VotingMethod::SimpleMajority, &["yes", "no"]);
        assert!(validate_choice(&p, &Choice::Single("yes".into()), 100).is_ok());

        let err = validate_choice(&p, &Choice::Single("maybe".into()), 100).unwrap_err();
        assert!(err.to_string().contains("unknown option"));
    }

    #[test]
    fn shape_mismatch_rejected() {
        let p = proposal(VotingMethod::SimpleMajority, &["yes", "no"]);
        let err =
            validate_choice(&p, &Choice::Ranked(vec!["yes".into()]), 100).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn ranked_rejects_duplicates() {
        let p = proposal(VotingMethod::RankedChoice, &["a", "b", "c"]);
        assert!(validate_choice(
            &p,
            &Choice::Ranked(vec!["b".into(), "a".into()]),
            100
        )
        .is_ok());

        let err = validate_choice(
            &p,
            &Choice::Ranked(vec!["a".into(), "a".into()]),
            100,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn ranked_may_rank_a_subset() {
        let p = proposal(VotingMethod::RankedChoice, &["a", "b", "c"]);
        assert!(validate_choice(&p, &Choice::Ranked(vec!["c".into()]), 100).is_ok());
    }

    #[test]
    fn approval_must_be_nonempty_subset() {
        let p = proposal(VotingMethod::Approval, &["a", "b"]);
        assert!(validate_choice(
            &p,
            &Choice::Approval(BTreeSet::from(["a".to_string(), "b".to_string()])),
            100
        )
        .is_ok());

        assert!(validate_choice(&p, &Choice::Approval(BTreeSet::new()), 100).is_err());
        assert!(validate_choice(
            &p,
            &Choice::Approval(BTreeSet::from(["z".to_string()])),
            100
        )
        .is_err());
    }

    #[test]
    fn quadratic_budget_enforced() {
        let p = proposal(VotingMethod::Quadratic, &["a", "b"]);
        let within = Choice::Quadratic(BTreeMap::from([("a".to_string(), 5), ("b".to_string(), 4)]));
        assert!(validate_choice(&p, &within, 9).is_ok());

        let over = Choice::Quadratic(BTreeMap::from([("a".to_string(), 6), ("b".to_string(), 4)]));
        let err = validate_choice(&p, &over, 9).unwrap_err();
        assert!(err.to_string().contains("budget"));
    }

    #[test]
    fn record_returns_superseded_ballot() {
        let mut bbox = BallotBox::new();
        let first = ballot("a", Choice::Single("yes".into()), 10);
        assert!(bbox.record(first).is_none());

        let second = ballot("a", Choice::Single("no".into()), 20);
        let superseded = bbox.record(second).expect("first ballot superseded");
        assert_eq!(superseded.cast_at, Timestamp::new(10));

        assert_eq!(bbox.len(), 1);
        let live = bbox.get(&ParticipantId::from("a")).unwrap();
        assert_eq!(live.choice, Choice::Single("no".into()));
    }

    #[test]
    fn voters_reflects_live_ballots() {
        let mut bbox = BallotBox::new();
        bbox.record(ballot("a", Choice::Single("yes".into()), 1));
        bbox.record(ballot("b", Choice::Single("no".into()), 2));
        bbox.record(ballot("a", Choice::Single("no".into()), 3));

        let voters = bbox.voters();
        assert_eq!(voters.len(), 2);
        assert!(voters.contains(&ParticipantId::from("a")));
    }
}
