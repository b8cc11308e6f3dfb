//! Proposals and their lifecycle.

use plenum_types::{ParticipantId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::VotingError;

/// The closed set of tally methods.
///
/// Each method has independent mathematical semantics; they share only the
/// ballots-and-weights-in, result-out contract, so they are dispatched as
/// variants rather than trait objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// Winner needs a weight share strictly above `pass_threshold`
    /// (default 0.5).
    SimpleMajority,
    /// Same algorithm as simple majority with a higher bar (default 2/3).
    Supermajority,
    /// Passes only with 100% of cast weight on one option; abstention does
    /// not break unanimity.
    Unanimous,
    /// Weighted instant-runoff over ranked ballots.
    RankedChoice,
    /// Every approved option receives the voter's full weight.
    Approval,
    /// Credits are square-rooted into vote magnitude.
    Quadratic,
}

impl VotingMethod {
    /// The default pass threshold where the method uses one.
    pub fn default_pass_threshold(&self) -> f64 {
        match self {
            Self::SimpleMajority => 0.5,
            Self::Supermajority => 2.0 / 3.0,
            // Approval defaults to plurality-only (no minimum share).
            Self::Approval => 0.0,
            Self::Unanimous | Self::RankedChoice | Self::Quadratic => 0.0,
        }
    }

    /// Whether `pass_threshold` participates in this method's decision.
    pub fn uses_pass_threshold(&self) -> bool {
        matches!(
            self,
            Self::SimpleMajority | Self::Supermajority | Self::Approval
        )
    }
}

impl fmt::Display for VotingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SimpleMajority => "simple_majority",
            Self::Supermajority => "supermajority",
            Self::Unanimous => "unanimous",
            Self::RankedChoice => "ranked_choice",
            Self::Approval => "approval",
            Self::Quadratic => "quadratic",
        };
        write!(f, "{name}")
    }
}

/// What happens when the leading options tie exactly.
///
/// The engine never silently picks an arbitrary winner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// A configured participant's ballot preference among the tied options
    /// decides.
    DesignatedTieBreaker(ParticipantId),
    /// A bounded second round restricted to the tied options is opened as a
    /// runoff proposal.
    Revote,
    /// No winner; the proposal is recorded as failed.
    Reject,
    /// Deterministic pick seeded from the proposal id and the tie set, so
    /// outcomes are reproducible.
    Random,
}

/// Lifecycle states. Transitions are monotonic: no state is ever revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Draft,
    Open,
    Tallied,
    Cancelled,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Tallied | Self::Cancelled)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Tallied => "tallied",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A decision put to the participants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    /// Ordered, distinct option labels.
    pub options: Vec<String>,
    pub method: VotingMethod,
    /// Fraction of total eligible weight that must participate, in (0, 1].
    pub quorum_threshold: f64,
    /// Method-dependent winning bar; see [`VotingMethod`].
    pub pass_threshold: f64,
    /// Absolute close time. `None` means the proposal only closes
    /// explicitly.
    pub deadline: Option<Timestamp>,
    pub tie_break: TieBreakPolicy,
    pub state: ProposalState,
    pub created_at: Timestamp,
    pub opened_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
}

impl Proposal {
    /// Structural validation, enforced before `Draft → Open`.
    ///
    /// Every rejection names the violated invariant.
    pub fn validate(&self) -> Result<(), VotingError> {
        if self.title.trim().is_empty() {
            return Err(VotingError::InvalidProposal(
                "title must not be empty".into(),
            ));
        }
        if self.options.len() < 2 {
            return Err(VotingError::InvalidProposal(
                "a proposal needs at least two options".into(),
            ));
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            if option.trim().is_empty() {
                return Err(VotingError::InvalidProposal(
                    "option labels must not be empty".into(),
                ));
            }
            if !seen.insert(option.as_str()) {
                return Err(VotingError::InvalidProposal(format!(
                    "duplicate option label: {option}"
                )));
            }
        }
        if !(self.quorum_threshold > 0.0 && self.quorum_threshold <= 1.0) {
            return Err(VotingError::InvalidProposal(format!(
                "quorum_threshold {} must be in (0, 1]",
                self.quorum_threshold
            )));
        }
        if self.method.uses_pass_threshold()
            && !(self.pass_threshold >= 0.0 && self.pass_threshold < 1.0)
        {
            return Err(VotingError::InvalidProposal(format!(
                "pass_threshold {} must be in [0, 1) for {}",
                self.pass_threshold, self.method
            )));
        }
        Ok(())
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }

    /// Position of an option in the proposal's declared order. Used for
    /// deterministic elimination ordering in ranked-choice rounds.
    pub fn option_index(&self, label: &str) -> Option<usize> {
        self.options.iter().position(|o| o == label)
    }
}
