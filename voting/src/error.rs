use plenum_store::StoreError;
use plenum_types::{ParticipantId, ProposalId};
use thiserror::Error;

use crate::proposal::ProposalState;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("participant {0} is not registered")]
    ParticipantNotFound(ParticipantId),

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} already exists")]
    DuplicateProposal(ProposalId),

    #[error("weight {0} is invalid: weights must be finite and non-negative")]
    InvalidWeight(f64),

    #[error("delegating {from} to {to} would create a delegation cycle")]
    DelegationCycle {
        from: ParticipantId,
        to: ParticipantId,
    },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("invalid ballot choice: {0}")]
    InvalidChoice(String),

    #[error("participant {0} is deactivated and may not vote")]
    InactiveParticipant(ParticipantId),

    #[error("proposal {id} is {state} and no longer accepts this operation")]
    AlreadyClosed { id: ProposalId, state: ProposalState },

    #[error("proposal {id} is {actual}, expected {expected}")]
    WrongState {
        id: ProposalId,
        expected: ProposalState,
        actual: ProposalState,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
